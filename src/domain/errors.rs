//! Domain error kinds shared by session state and the dispatcher.

use thiserror::Error;

/// Failure parsing a realm's `map_data` blob into [`crate::domain::realm_map::RealmMap`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealmMapError {
    #[error("map data is not valid JSON")]
    Malformed,
    #[error("map data declares zero rooms")]
    NoRooms,
    #[error("room {0} spawn coordinates are not finite")]
    BadSpawn(usize),
    #[error("room {0} teleport target room {1} does not exist")]
    BadTeleportTarget(usize, usize),
}

/// Failures raised by [`crate::domain::session::Session`] mutators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("room index {0} is not valid for this realm")]
    BadRoom(u32),
    #[error("player {0} is not a member of this session")]
    UnknownPlayer(uuid::Uuid),
}

/// The seven error kinds from the dispatcher's error handling design.
///
/// Each variant carries enough context to be rendered directly into an
/// outbound `error`/`joinFailed`/`sessionTerminated` payload.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limit exceeded for {0}")]
    RateLimited(&'static str),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("evicted: {0}")]
    Evicted(String),
}
