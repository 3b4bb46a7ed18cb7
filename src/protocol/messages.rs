//! Inbound and outbound message envelopes.
//!
//! Grounded on the teacher's `protocol::messages` module: `#[serde(tag =
//! "type", content = "data")]` tagged enums, boxed payload structs where a
//! variant carries enough fields to bloat the enum's overall size.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error_codes::{ErrorCode, TerminationCode};
use super::types::{PlayerId, PlayerView, RealmId, RealmInfo};

/// Messages the client sends to the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "joinRealm")]
    JoinRealm {
        #[serde(rename = "realmId")]
        realm_id: RealmId,
        #[serde(rename = "shareId", default)]
        share_id: Option<String>,
    },
    #[serde(rename = "movePlayer")]
    MovePlayer { x: f64, y: f64 },
    #[serde(rename = "teleport")]
    Teleport {
        x: f64,
        y: f64,
        #[serde(rename = "roomIndex")]
        room_index: i64,
    },
    #[serde(rename = "changedSkin")]
    ChangedSkin(String),
    #[serde(rename = "sendMessage")]
    SendMessage(String),
    #[serde(rename = "kickPlayer")]
    KickPlayer {
        uid: PlayerId,
    },
}

impl ClientMessage {
    /// The event name used for rate-limit bucketing and error replies —
    /// independent of serde's wire renaming so log lines and bucket keys
    /// stay stable even if the wire name ever changes.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::JoinRealm { .. } => "joinRealm",
            Self::MovePlayer { .. } => "movePlayer",
            Self::Teleport { .. } => "teleport",
            Self::ChangedSkin(_) => "changedSkin",
            Self::SendMessage(_) => "sendMessage",
            Self::KickPlayer { .. } => "kickPlayer",
        }
    }
}

/// Initial-state payload delivered to the joining client only.
#[derive(Debug, Clone, Serialize)]
pub struct RoomJoinedPayload {
    pub realm: RealmInfo,
    pub player: PlayerView,
    #[serde(rename = "roomIndex")]
    pub room_index: u32,
}

/// Messages the server sends to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "joinedRoom")]
    JoinedRoom(Box<RoomJoinedPayload>),
    #[serde(rename = "joinFailed")]
    JoinFailed(String),
    #[serde(rename = "playerJoinedRoom")]
    PlayerJoinedRoom(Box<PlayerView>),
    #[serde(rename = "playerLeftRoom")]
    PlayerLeftRoom { uid: PlayerId },
    #[serde(rename = "playerMoved")]
    PlayerMoved { uid: PlayerId, x: f64, y: f64 },
    #[serde(rename = "playerTeleported")]
    PlayerTeleported {
        uid: PlayerId,
        x: f64,
        y: f64,
        #[serde(rename = "roomIndex")]
        room_index: u32,
    },
    #[serde(rename = "playerChangedSkin")]
    PlayerChangedSkin { uid: PlayerId, skin: String },
    #[serde(rename = "receiveMessage")]
    ReceiveMessage { uid: PlayerId, message: String },
    #[serde(rename = "proximityUpdate")]
    ProximityUpdate {
        #[serde(rename = "proximityId")]
        proximity_id: Option<PlayerId>,
    },
    #[serde(rename = "sessionTerminated")]
    SessionTerminated {
        code: TerminationCode,
        reason: String,
    },
    #[serde(rename = "error")]
    Error {
        event: String,
        code: ErrorCode,
        message: String,
    },
}

impl ServerMessage {
    pub fn proximity_update(proximity_id: Option<Uuid>) -> Self {
        Self::ProximityUpdate { proximity_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_tag_matches_event_name() {
        let json = r#"{"type": "movePlayer", "data": {"x": 1.0, "y": 2.0}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.event_name(), "movePlayer");
        matches!(msg, ClientMessage::MovePlayer { x, y } if x == 1.0 && y == 2.0);
    }

    #[test]
    fn join_realm_accepts_missing_share_id() {
        let json = r#"{"type": "joinRealm", "data": {"realmId": "00000000-0000-0000-0000-000000000001"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::JoinRealm { share_id: None, .. }));
    }

    #[test]
    fn server_message_serializes_tagged_envelope() {
        let msg = ServerMessage::PlayerLeftRoom { uid: Uuid::nil() };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "playerLeftRoom");
        assert_eq!(json["data"]["uid"], Uuid::nil().to_string());
    }

    #[test]
    fn error_code_round_trips() {
        let msg = ServerMessage::Error {
            event: "movePlayer".into(),
            code: ErrorCode::RateLimited,
            message: "slow down".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["data"]["code"], "RATE_LIMITED");
    }
}
