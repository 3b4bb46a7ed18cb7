//! Core in-memory domain: realm map parsing, proximity grouping, session
//! state, and the session/user registries. No networking or serialization
//! lives here — see [`crate::protocol`] and [`crate::server`] for those.

pub mod errors;
pub mod proximity;
pub mod realm_map;
pub mod session;
pub mod session_manager;
pub mod user_registry;

pub use errors::{DispatchError, RealmMapError, SessionError};
pub use proximity::{ProximityIndex, PROXIMITY_RADIUS};
pub use realm_map::RealmMap;
pub use session::{coordinates_in_range, Player, RealmId, Session, SocketId, UserId};
pub use session_manager::{EvictionCode, RemovedPlayer, SessionManager};
pub use user_registry::{Principal, UserRegistry};
