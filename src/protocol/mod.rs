//! Wire protocol: message envelopes, error codes, payload validation.

pub mod error_codes;
pub mod messages;
pub mod types;
pub mod validation;

pub use error_codes::{ErrorCode, TerminationCode};
pub use messages::{ClientMessage, RoomJoinedPayload, ServerMessage};
pub use types::{PlayerId, PlayerView, RealmId, RealmInfo};
pub use validation::{
    validate_chat_message, validate_coordinates, validate_room_index, validate_share_id,
    validate_skin, ValidationError,
};
