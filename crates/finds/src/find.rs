use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use findermeister_events::Event;

/// Find identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindId(pub AggregateId);

impl FindId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for FindId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Find lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindStatus {
    Open,
    Closed,
}

/// Aggregate root: a client's request to locate something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Find {
    id: FindId,
    client_id: UserId,
    title: String,
    description: String,
    budget: Option<u64>,
    status: FindStatus,
    version: u64,
    created: bool,
}

impl Find {
    /// Create an empty, not-yet-posted instance for rehydration.
    pub fn empty(id: FindId) -> Self {
        Self {
            id,
            client_id: UserId::from_uuid(uuid::Uuid::nil()),
            title: String::new(),
            description: String::new(),
            budget: None,
            status: FindStatus::Open,
            version: 0,
            created: false,
        }
    }

    pub fn client_id(&self) -> UserId {
        self.client_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> FindStatus {
        self.status
    }

    /// Whether finders may still bid on this find.
    pub fn accepts_proposals(&self) -> bool {
        self.status == FindStatus::Open
    }
}

impl AggregateRoot for Find {
    type Id = FindId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PostFind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFind {
    pub find_id: FindId,
    pub client_id: UserId,
    pub title: String,
    pub description: String,
    pub budget: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateFind. Only the posting client may update, only while open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFind {
    pub find_id: FindId,
    pub client_id: UserId,
    /// Optional new title (if None, keep existing).
    pub title: Option<String>,
    /// Optional new description (if None, keep existing).
    pub description: Option<String>,
    pub budget: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CloseFind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseFind {
    pub find_id: FindId,
    pub client_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindCommand {
    PostFind(PostFind),
    UpdateFind(UpdateFind),
    CloseFind(CloseFind),
}

/// Event: FindPosted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindPosted {
    pub find_id: FindId,
    pub client_id: UserId,
    pub title: String,
    pub description: String,
    pub budget: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FindUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindUpdated {
    pub find_id: FindId,
    pub title: String,
    pub description: String,
    pub budget: Option<u64>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FindClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindClosed {
    pub find_id: FindId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindEvent {
    FindPosted(FindPosted),
    FindUpdated(FindUpdated),
    FindClosed(FindClosed),
}

impl Event for FindEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FindEvent::FindPosted(_) => "finds.find.posted",
            FindEvent::FindUpdated(_) => "finds.find.updated",
            FindEvent::FindClosed(_) => "finds.find.closed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FindEvent::FindPosted(e) => e.occurred_at,
            FindEvent::FindUpdated(e) => e.occurred_at,
            FindEvent::FindClosed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Find {
    type Command = FindCommand;
    type Event = FindEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            FindEvent::FindPosted(e) => {
                self.id = e.find_id;
                self.client_id = e.client_id;
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.budget = e.budget;
                self.status = FindStatus::Open;
                self.created = true;
            }
            FindEvent::FindUpdated(e) => {
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.budget = e.budget;
            }
            FindEvent::FindClosed(_) => {
                self.status = FindStatus::Closed;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            FindCommand::PostFind(cmd) => self.handle_post(cmd),
            FindCommand::UpdateFind(cmd) => self.handle_update(cmd),
            FindCommand::CloseFind(cmd) => self.handle_close(cmd),
        }
    }
}

impl Find {
    fn ensure_find_id(&self, find_id: FindId) -> Result<(), DomainError> {
        if self.id != find_id {
            return Err(DomainError::invariant("find_id mismatch"));
        }
        Ok(())
    }

    fn ensure_owner(&self, client_id: UserId) -> Result<(), DomainError> {
        if self.client_id != client_id {
            return Err(DomainError::Unauthorized);
        }
        Ok(())
    }

    fn handle_post(&self, cmd: &PostFind) -> Result<Vec<FindEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("find already posted"));
        }
        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        if cmd.description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }

        Ok(vec![FindEvent::FindPosted(FindPosted {
            find_id: cmd.find_id,
            client_id: cmd.client_id,
            title: cmd.title.trim().to_string(),
            description: cmd.description.clone(),
            budget: cmd.budget,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateFind) -> Result<Vec<FindEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_find_id(cmd.find_id)?;
        self.ensure_owner(cmd.client_id)?;

        if self.status == FindStatus::Closed {
            return Err(DomainError::conflict("closed find cannot be updated"));
        }

        let new_title = cmd.title.clone().unwrap_or_else(|| self.title.clone());
        if new_title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        let new_description = cmd
            .description
            .clone()
            .unwrap_or_else(|| self.description.clone());

        Ok(vec![FindEvent::FindUpdated(FindUpdated {
            find_id: cmd.find_id,
            title: new_title,
            description: new_description,
            budget: cmd.budget.or(self.budget),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_close(&self, cmd: &CloseFind) -> Result<Vec<FindEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_find_id(cmd.find_id)?;
        self.ensure_owner(cmd.client_id)?;

        if self.status == FindStatus::Closed {
            return Err(DomainError::conflict("find is already closed"));
        }

        Ok(vec![FindEvent::FindClosed(FindClosed {
            find_id: cmd.find_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
