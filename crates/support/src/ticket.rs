use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use findermeister_events::Event;

/// Ticket identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub AggregateId);

impl TicketId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TicketId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Ticket severity, ordered low to critical. Escalation raises it one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TicketSeverity {
    pub fn escalated(self) -> Option<Self> {
        match self {
            TicketSeverity::Low => Some(TicketSeverity::Medium),
            TicketSeverity::Medium => Some(TicketSeverity::High),
            TicketSeverity::High => Some(TicketSeverity::Critical),
            TicketSeverity::Critical => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Resolved,
}

/// Aggregate root: a support ticket. Escalate and resolve are gated by the
/// agent capability at the API boundary; reply authorship is enforced in the
/// aggregate itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportTicket {
    id: TicketId,
    opened_by: UserId,
    subject: String,
    severity: TicketSeverity,
    status: TicketStatus,
    reply_count: u64,
    version: u64,
    created: bool,
}

impl SupportTicket {
    pub fn empty(id: TicketId) -> Self {
        Self {
            id,
            opened_by: UserId::from_uuid(uuid::Uuid::nil()),
            subject: String::new(),
            severity: TicketSeverity::Low,
            status: TicketStatus::Open,
            reply_count: 0,
            version: 0,
            created: false,
        }
    }

    pub fn opened_by(&self) -> UserId {
        self.opened_by
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn severity(&self) -> TicketSeverity {
        self.severity
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn reply_count(&self) -> u64 {
        self.reply_count
    }
}

impl AggregateRoot for SupportTicket {
    type Id = TicketId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenTicket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTicket {
    pub ticket_id: TicketId,
    pub opened_by: UserId,
    pub subject: String,
    pub severity: TicketSeverity,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReplyToTicket (opener or a support agent).
///
/// `as_agent` carries the caller's capability check into the aggregate so
/// authorship is enforced here, not only at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyToTicket {
    pub ticket_id: TicketId,
    pub replied_by: UserId,
    pub as_agent: bool,
    pub body: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EscalateTicket (support agent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalateTicket {
    pub ticket_id: TicketId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ResolveTicket (support agent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveTicket {
    pub ticket_id: TicketId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketCommand {
    Open(OpenTicket),
    Reply(ReplyToTicket),
    Escalate(EscalateTicket),
    Resolve(ResolveTicket),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketOpened {
    pub ticket_id: TicketId,
    pub opened_by: UserId,
    pub subject: String,
    pub severity: TicketSeverity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReplied {
    pub ticket_id: TicketId,
    pub replied_by: UserId,
    pub body: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketEscalated {
    pub ticket_id: TicketId,
    pub severity: TicketSeverity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketResolved {
    pub ticket_id: TicketId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketEvent {
    Opened(TicketOpened),
    Replied(TicketReplied),
    Escalated(TicketEscalated),
    Resolved(TicketResolved),
}

impl Event for TicketEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TicketEvent::Opened(_) => "support.ticket.opened",
            TicketEvent::Replied(_) => "support.ticket.replied",
            TicketEvent::Escalated(_) => "support.ticket.escalated",
            TicketEvent::Resolved(_) => "support.ticket.resolved",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TicketEvent::Opened(e) => e.occurred_at,
            TicketEvent::Replied(e) => e.occurred_at,
            TicketEvent::Escalated(e) => e.occurred_at,
            TicketEvent::Resolved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SupportTicket {
    type Command = TicketCommand;
    type Event = TicketEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TicketEvent::Opened(e) => {
                self.id = e.ticket_id;
                self.opened_by = e.opened_by;
                self.subject = e.subject.clone();
                self.severity = e.severity;
                self.status = TicketStatus::Open;
                self.created = true;
            }
            TicketEvent::Replied(_) => self.reply_count += 1,
            TicketEvent::Escalated(e) => self.severity = e.severity,
            TicketEvent::Resolved(_) => self.status = TicketStatus::Resolved,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TicketCommand::Open(cmd) => self.handle_open(cmd),
            TicketCommand::Reply(cmd) => self.handle_reply(cmd),
            TicketCommand::Escalate(cmd) => self.handle_escalate(cmd),
            TicketCommand::Resolve(cmd) => self.handle_resolve(cmd),
        }
    }
}

impl SupportTicket {
    fn ensure_open(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.status != TicketStatus::Open {
            return Err(DomainError::conflict("ticket is already resolved"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenTicket) -> Result<Vec<TicketEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("ticket already opened"));
        }
        if cmd.subject.trim().is_empty() {
            return Err(DomainError::validation("ticket subject cannot be empty"));
        }

        Ok(vec![TicketEvent::Opened(TicketOpened {
            ticket_id: cmd.ticket_id,
            opened_by: cmd.opened_by,
            subject: cmd.subject.trim().to_string(),
            severity: cmd.severity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reply(&self, cmd: &ReplyToTicket) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_open()?;
        if !cmd.as_agent && cmd.replied_by != self.opened_by {
            return Err(DomainError::Unauthorized);
        }
        if cmd.body.trim().is_empty() {
            return Err(DomainError::validation("reply body cannot be empty"));
        }

        Ok(vec![TicketEvent::Replied(TicketReplied {
            ticket_id: cmd.ticket_id,
            replied_by: cmd.replied_by,
            body: cmd.body.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_escalate(&self, cmd: &EscalateTicket) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_open()?;
        let severity = self
            .severity
            .escalated()
            .ok_or_else(|| DomainError::conflict("ticket is already at critical severity"))?;

        Ok(vec![TicketEvent::Escalated(TicketEscalated {
            ticket_id: cmd.ticket_id,
            severity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_resolve(&self, cmd: &ResolveTicket) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_open()?;

        Ok(vec![TicketEvent::Resolved(TicketResolved {
            ticket_id: cmd.ticket_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened(severity: TicketSeverity) -> SupportTicket {
        let id = TicketId::new(AggregateId::new());
        let mut t = SupportTicket::empty(id);
        let events = t
            .handle(&TicketCommand::Open(OpenTicket {
                ticket_id: id,
                opened_by: UserId::new(),
                subject: "cannot withdraw my proposal".to_string(),
                severity,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            t.apply(e);
        }
        t
    }

    #[test]
    fn escalation_raises_severity_one_level() {
        let mut t = opened(TicketSeverity::Low);
        let events = t
            .handle(&TicketCommand::Escalate(EscalateTicket {
                ticket_id: *t.id(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            t.apply(e);
        }
        assert_eq!(t.severity(), TicketSeverity::Medium);
    }

    #[test]
    fn critical_tickets_cannot_escalate_further() {
        let t = opened(TicketSeverity::Critical);
        let err = t
            .handle(&TicketCommand::Escalate(EscalateTicket {
                ticket_id: *t.id(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn resolved_tickets_reject_replies() {
        let mut t = opened(TicketSeverity::Medium);
        let events = t
            .handle(&TicketCommand::Resolve(ResolveTicket {
                ticket_id: *t.id(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            t.apply(e);
        }

        let err = t
            .handle(&TicketCommand::Reply(ReplyToTicket {
                ticket_id: *t.id(),
                replied_by: t.opened_by(),
                as_agent: false,
                body: "bump".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn only_the_opener_or_an_agent_may_reply() {
        let t = opened(TicketSeverity::Low);
        let stranger = UserId::new();

        let err = t
            .handle(&TicketCommand::Reply(ReplyToTicket {
                ticket_id: *t.id(),
                replied_by: stranger,
                as_agent: false,
                body: "any update?".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized));

        let events = t
            .handle(&TicketCommand::Reply(ReplyToTicket {
                ticket_id: *t.id(),
                replied_by: stranger,
                as_agent: true,
                body: "looking into it".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);
    }
}
