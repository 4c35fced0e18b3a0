//! Infrastructure wiring: event store, bus, dispatcher, projections, and the
//! background subscriber feeding them.

use std::sync::Arc;

use findermeister_auth::{Session, UserLookup};
use findermeister_contracts::ContractId;
use findermeister_core::{AggregateId, DomainError, UserId};
use findermeister_events::{EventEnvelope, InMemoryEventBus};
use findermeister_finds::FindId;
use findermeister_infra::{
    command_dispatcher::{CommandDispatcher, DispatchError},
    event_store::{InMemoryEventStore, StoredEvent},
    workers::{ProjectionWorker, WorkerHandle},
    projections::{
        ContractReadModel, ContractsProjection, FindReadModel, FindsProjection, ProposalReadModel,
        ProposalsProjection, ThreadReadModel, ThreadsProjection, TicketReadModel,
        TicketsProjection, TokenBalanceReadModel, TokenBalancesProjection, UserReadModel,
        UsersProjection,
    },
    read_model::InMemoryReadStore,
};
use findermeister_messaging::ThreadId;
use findermeister_proposals::ProposalId;
use findermeister_support::TicketId;

use crate::capability::CapabilityRegistry;

type Dispatcher = CommandDispatcher<
    Arc<InMemoryEventStore>,
    Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>>,
>;

type Store<K, V> = Arc<InMemoryReadStore<K, V>>;

pub struct AppServices {
    dispatcher: Arc<Dispatcher>,
    pub users: Arc<UsersProjection<Store<UserId, UserReadModel>>>,
    pub finds: Arc<FindsProjection<Store<FindId, FindReadModel>>>,
    pub proposals: Arc<ProposalsProjection<Store<ProposalId, ProposalReadModel>>>,
    pub token_balances: Arc<TokenBalancesProjection<Store<UserId, TokenBalanceReadModel>>>,
    pub contracts: Arc<ContractsProjection<Store<ContractId, ContractReadModel>>>,
    pub threads: Arc<ThreadsProjection<Store<ThreadId, ThreadReadModel>>>,
    pub tickets: Arc<TicketsProjection<Store<TicketId, TicketReadModel>>>,
    pub capabilities: Arc<CapabilityRegistry>,
    // Keeps the bus -> projections worker alive for the lifetime of the app.
    _projection_worker: WorkerHandle,
}

/// `UserLookup` over the users projection: the resolver reads ban and
/// verification state fresh on every request.
#[derive(Clone)]
pub struct ProjectionUserLookup {
    users: Arc<UsersProjection<Store<UserId, UserReadModel>>>,
}

impl UserLookup for ProjectionUserLookup {
    fn find_user(&self, id: UserId) -> Option<Session> {
        self.users.get(&id).map(|model| model.to_session())
    }
}

pub fn build_services() -> AppServices {
    // In-memory infra wiring (dev/test): store + bus + projections.
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<InMemoryEventBus<EventEnvelope<serde_json::Value>>> =
        Arc::new(InMemoryEventBus::new());

    let users: Arc<UsersProjection<_>> =
        Arc::new(UsersProjection::new(Arc::new(InMemoryReadStore::new())));
    let finds: Arc<FindsProjection<_>> =
        Arc::new(FindsProjection::new(Arc::new(InMemoryReadStore::new())));
    let proposals: Arc<ProposalsProjection<_>> =
        Arc::new(ProposalsProjection::new(Arc::new(InMemoryReadStore::new())));
    let token_balances: Arc<TokenBalancesProjection<_>> = Arc::new(TokenBalancesProjection::new(
        Arc::new(InMemoryReadStore::new()),
    ));
    let contracts: Arc<ContractsProjection<_>> =
        Arc::new(ContractsProjection::new(Arc::new(InMemoryReadStore::new())));
    let threads: Arc<ThreadsProjection<_>> =
        Arc::new(ThreadsProjection::new(Arc::new(InMemoryReadStore::new())));
    let tickets: Arc<TicketsProjection<_>> =
        Arc::new(TicketsProjection::new(Arc::new(InMemoryReadStore::new())));

    // Background subscriber: bus -> projections
    let worker = {
        let users = users.clone();
        let finds = finds.clone();
        let proposals = proposals.clone();
        let token_balances = token_balances.clone();
        let contracts = contracts.clone();
        let threads = threads.clone();
        let tickets = tickets.clone();
        ProjectionWorker::spawn(
            "projections",
            bus.clone(),
            move |env: EventEnvelope<serde_json::Value>| match env.aggregate_type() {
                "auth.user" => users.apply_envelope(&env),
                "finds.find" => finds.apply_envelope(&env),
                "proposals.proposal" => proposals.apply_envelope(&env),
                "proposals.tokens" => token_balances.apply_envelope(&env),
                "contracts.contract" => contracts.apply_envelope(&env),
                "messaging.thread" => threads.apply_envelope(&env),
                "support.ticket" => tickets.apply_envelope(&env),
                _ => Ok(()),
            },
        )
    };

    let dispatcher: Arc<Dispatcher> =
        Arc::new(CommandDispatcher::new(store.clone(), bus.clone()));

    AppServices {
        dispatcher,
        users,
        finds,
        proposals,
        token_balances,
        contracts,
        threads,
        tickets,
        capabilities: Arc::new(CapabilityRegistry::new()),
        _projection_worker: worker,
    }
}

impl AppServices {
    pub fn user_lookup(&self) -> ProjectionUserLookup {
        ProjectionUserLookup {
            users: self.users.clone(),
        }
    }

    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: findermeister_core::Aggregate<Error = DomainError>,
        A::Event: findermeister_events::Event + serde::Serialize + serde::de::DeserializeOwned,
    {
        self.dispatcher
            .dispatch::<A>(aggregate_id, aggregate_type, command, make_aggregate)
    }
}
