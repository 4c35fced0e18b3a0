use core::str::FromStr;

use serde::{Deserialize, Serialize};

use findermeister_core::DomainError;

/// Account role, fixed at registration.
///
/// The role set is closed so the authorization gate's dispatch is exhaustive
/// and compiler-checked; there is no default branch for an unknown role to
/// fall through silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Posts finds and hires finders.
    Client,
    /// Submits proposals and completes contract work.
    Finder,
    /// Moderates accounts and reviews identity verification.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Finder => "finder",
            Role::Admin => "admin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "finder" => Ok(Role::Finder),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!(
                "role must be one of: client, finder, admin (got '{other}')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Client, Role::Finder, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Finder).unwrap(), "\"finder\"");
    }
}
