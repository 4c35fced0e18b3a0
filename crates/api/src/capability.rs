//! Support-agent capability registry.
//!
//! The agent capability is not a [`Role`](findermeister_auth::Role): it is a
//! server-side grant on top of an account, probed by the client once per
//! mount via `GET /session/agent-probe`.

use std::collections::HashSet;
use std::sync::RwLock;

use findermeister_core::UserId;

#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    agents: RwLock<HashSet<UserId>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_agent(&self, user_id: UserId) {
        if let Ok(mut agents) = self.agents.write() {
            agents.insert(user_id);
        }
    }

    pub fn revoke_agent(&self, user_id: UserId) {
        if let Ok(mut agents) = self.agents.write() {
            agents.remove(&user_id);
        }
    }

    pub fn is_agent(&self, user_id: UserId) -> bool {
        self.agents
            .read()
            .map(|agents| agents.contains(&user_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_and_revoke() {
        let registry = CapabilityRegistry::new();
        let user = UserId::new();

        assert!(!registry.is_agent(user));
        registry.grant_agent(user);
        assert!(registry.is_agent(user));
        registry.revoke_agent(user);
        assert!(!registry.is_agent(user));
    }
}
