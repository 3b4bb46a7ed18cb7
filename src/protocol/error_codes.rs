//! Error codes carried on `error`/`sessionTerminated` payloads.
//!
//! Grounded on the teacher's `protocol::error_codes::ErrorCode`: a flat enum
//! with `SCREAMING_SNAKE_CASE` wire names and a `description()` method
//! carrying an actionable, human-readable message, trimmed down to the
//! kinds this system's error handling design (§7) actually produces.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthError,
    RateLimited,
}

impl ErrorCode {
    pub fn description(&self) -> &'static str {
        match self {
            Self::AuthError => {
                "Authentication failed. The bearer token or claimed user id was rejected."
            }
            Self::RateLimited => "Too many requests of this type. Slow down and try again.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Terminal reason codes for `sessionTerminated`, re-exported here so
/// `protocol::messages` doesn't need to depend on `domain` for a simple
/// wire enum. Kept in lockstep with [`crate::domain::EvictionCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationCode {
    RealmUpdated,
    RealmDeleted,
    OwnerKicked,
    ServerRestart,
}

impl From<crate::domain::EvictionCode> for TerminationCode {
    fn from(code: crate::domain::EvictionCode) -> Self {
        match code {
            crate::domain::EvictionCode::RealmUpdated => Self::RealmUpdated,
            crate::domain::EvictionCode::RealmDeleted => Self::RealmDeleted,
            crate::domain::EvictionCode::OwnerKicked => Self::OwnerKicked,
            crate::domain::EvictionCode::ServerRestart => Self::ServerRestart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_is_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::RateLimited).unwrap(),
            "\"RATE_LIMITED\""
        );
        assert_eq!(
            serde_json::to_string(&TerminationCode::OwnerKicked).unwrap(),
            "\"OWNER_KICKED\""
        );
    }

    #[test]
    fn descriptions_are_non_trivial() {
        assert!(ErrorCode::AuthError.description().len() > 10);
        assert!(ErrorCode::RateLimited.description().len() > 10);
    }
}
