//! Wire-facing identifier aliases and payload structs shared by several
//! message variants. Grounded on the teacher's `protocol::types` module
//! (`PlayerId`/`RoomId` as `Uuid` aliases, small `#[derive]`-heavy structs).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PlayerId = Uuid;
pub type RealmId = Uuid;

/// Realm identity as sent in `joinedRoom`'s initial-state payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealmInfo {
    pub id: RealmId,
    pub owner_id: PlayerId,
}

/// A player's public, wire-serializable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub uid: PlayerId,
    pub username: String,
    pub skin: String,
    pub room_index: u32,
    pub x: f64,
    pub y: f64,
    pub proximity_id: Option<PlayerId>,
}

impl From<&crate::domain::Player> for PlayerView {
    fn from(p: &crate::domain::Player) -> Self {
        Self {
            uid: p.user_id,
            username: p.username.clone(),
            skin: p.skin.clone(),
            room_index: p.room_index,
            x: p.x,
            y: p.y,
            proximity_id: p.proximity_id,
        }
    }
}
