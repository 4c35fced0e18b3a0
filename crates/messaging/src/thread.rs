use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use findermeister_events::Event;
use findermeister_finds::FindId;

/// Thread identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub AggregateId);

impl ThreadId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: one conversation per (find, client, finder) pairing.
/// Messages append in order; only the two participants may post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    id: ThreadId,
    find_id: FindId,
    client_id: UserId,
    finder_id: UserId,
    message_count: u64,
    version: u64,
    created: bool,
}

impl Thread {
    pub fn empty(id: ThreadId) -> Self {
        Self {
            id,
            find_id: FindId::new(AggregateId::from_uuid(uuid::Uuid::nil())),
            client_id: UserId::from_uuid(uuid::Uuid::nil()),
            finder_id: UserId::from_uuid(uuid::Uuid::nil()),
            message_count: 0,
            version: 0,
            created: false,
        }
    }

    pub fn find_id(&self) -> FindId {
        self.find_id
    }

    pub fn client_id(&self) -> UserId {
        self.client_id
    }

    pub fn finder_id(&self) -> UserId {
        self.finder_id
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.client_id == user_id || self.finder_id == user_id
    }
}

impl AggregateRoot for Thread {
    type Id = ThreadId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: StartThread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartThread {
    pub thread_id: ThreadId,
    pub find_id: FindId,
    pub client_id: UserId,
    pub finder_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PostMessage (either participant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMessage {
    pub thread_id: ThreadId,
    pub sender_id: UserId,
    pub body: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadCommand {
    Start(StartThread),
    Post(PostMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadStarted {
    pub thread_id: ThreadId,
    pub find_id: FindId,
    pub client_id: UserId,
    pub finder_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePosted {
    pub thread_id: ThreadId,
    pub sender_id: UserId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadEvent {
    Started(ThreadStarted),
    MessagePosted(MessagePosted),
}

impl Event for ThreadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ThreadEvent::Started(_) => "messaging.thread.started",
            ThreadEvent::MessagePosted(_) => "messaging.thread.message_posted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ThreadEvent::Started(e) => e.occurred_at,
            ThreadEvent::MessagePosted(e) => e.sent_at,
        }
    }
}

impl Aggregate for Thread {
    type Command = ThreadCommand;
    type Event = ThreadEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ThreadEvent::Started(e) => {
                self.id = e.thread_id;
                self.find_id = e.find_id;
                self.client_id = e.client_id;
                self.finder_id = e.finder_id;
                self.created = true;
            }
            ThreadEvent::MessagePosted(_) => self.message_count += 1,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ThreadCommand::Start(cmd) => self.handle_start(cmd),
            ThreadCommand::Post(cmd) => self.handle_post(cmd),
        }
    }
}

impl Thread {
    fn handle_start(&self, cmd: &StartThread) -> Result<Vec<ThreadEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("thread already started"));
        }
        if cmd.client_id == cmd.finder_id {
            return Err(DomainError::validation(
                "a thread needs two distinct participants",
            ));
        }

        Ok(vec![ThreadEvent::Started(ThreadStarted {
            thread_id: cmd.thread_id,
            find_id: cmd.find_id,
            client_id: cmd.client_id,
            finder_id: cmd.finder_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_post(&self, cmd: &PostMessage) -> Result<Vec<ThreadEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if !self.is_participant(cmd.sender_id) {
            return Err(DomainError::Unauthorized);
        }
        if cmd.body.trim().is_empty() {
            return Err(DomainError::validation("message body cannot be empty"));
        }

        Ok(vec![ThreadEvent::MessagePosted(MessagePosted {
            thread_id: cmd.thread_id,
            sender_id: cmd.sender_id,
            body: cmd.body.clone(),
            sent_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> (Thread, UserId, UserId) {
        let id = ThreadId::new(AggregateId::new());
        let client = UserId::new();
        let finder = UserId::new();
        let mut t = Thread::empty(id);
        let events = t
            .handle(&ThreadCommand::Start(StartThread {
                thread_id: id,
                find_id: FindId::new(AggregateId::new()),
                client_id: client,
                finder_id: finder,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            t.apply(e);
        }
        (t, client, finder)
    }

    #[test]
    fn both_participants_may_post() {
        let (mut t, client, finder) = started();
        let id = *t.id();
        for sender in [client, finder] {
            let events = t
                .handle(&ThreadCommand::Post(PostMessage {
                    thread_id: id,
                    sender_id: sender,
                    body: "checking in".to_string(),
                    occurred_at: Utc::now(),
                }))
                .unwrap();
            for e in &events {
                t.apply(e);
            }
        }
        assert_eq!(t.message_count(), 2);
    }

    #[test]
    fn outsiders_may_not_post() {
        let (t, _, _) = started();
        let err = t
            .handle(&ThreadCommand::Post(PostMessage {
                thread_id: *t.id(),
                sender_id: UserId::new(),
                body: "hi".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::Unauthorized);
    }

    #[test]
    fn blank_messages_are_rejected() {
        let (t, client, _) = started();
        let err = t
            .handle(&ThreadCommand::Post(PostMessage {
                thread_id: *t.id(),
                sender_id: client,
                body: "   ".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
