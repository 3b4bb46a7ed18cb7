//! Pure parser turning a realm's opaque `map_data` blob into structured rooms.
//!
//! Grounded on the teacher's `protocol::room_state` module's pattern of
//! deriving a typed, immutable struct from external input before any state
//! is created around it — [`RealmMap::parse`] is the equivalent of that
//! pre-session validation step, generalized from "lobby config" to "tile map".

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::errors::RealmMapError;

/// A single barrier or teleport tile coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub x: i64,
    pub y: i64,
}

/// A teleport tile: stepping on `(from_x, from_y)` moves the player to
/// `(to_room, to_x, to_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Teleport {
    pub from_x: i64,
    pub from_y: i64,
    pub to_room: usize,
    pub to_x: f64,
    pub to_y: f64,
}

/// Raw wire shape of a single room entry inside `map_data`.
#[derive(Debug, Deserialize)]
struct RawRoom {
    spawn: (f64, f64),
    #[serde(default)]
    barrier_tiles: Vec<Tile>,
    #[serde(default)]
    teleports: Vec<Teleport>,
}

#[derive(Debug, Deserialize)]
struct RawMapData {
    rooms: Vec<RawRoom>,
}

/// One room's static geometry, derived from `map_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub spawn: (f64, f64),
    pub barrier_tiles: HashSet<(i64, i64)>,
    pub teleports: Vec<Teleport>,
}

/// The parsed, immutable shape of a realm's map. Never mutated once built;
/// a realm's [`crate::domain::session::Session`] holds one `Arc<RealmMap>`
/// for its whole lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct RealmMap {
    pub rooms: Vec<Room>,
}

impl RealmMap {
    /// Parses `map_data` (raw JSON text) into a `RealmMap`.
    ///
    /// Fails with [`RealmMapError::Malformed`] if the JSON doesn't match the
    /// expected shape, [`RealmMapError::NoRooms`] if it declares zero rooms,
    /// and catches a couple of obviously-corrupt inputs (non-finite spawns,
    /// teleports pointing at a room index that doesn't exist) so a bad
    /// realm record fails loudly at load time rather than panicking later
    /// deep inside proximity or movement handling.
    pub fn parse(map_data: &str) -> Result<Self, RealmMapError> {
        let raw: RawMapData =
            serde_json::from_str(map_data).map_err(|_| RealmMapError::Malformed)?;

        if raw.rooms.is_empty() {
            return Err(RealmMapError::NoRooms);
        }

        let room_count = raw.rooms.len();
        let mut rooms = Vec::with_capacity(room_count);
        for (index, raw_room) in raw.rooms.into_iter().enumerate() {
            if !raw_room.spawn.0.is_finite() || !raw_room.spawn.1.is_finite() {
                return Err(RealmMapError::BadSpawn(index));
            }
            for teleport in &raw_room.teleports {
                if teleport.to_room >= room_count {
                    return Err(RealmMapError::BadTeleportTarget(index, teleport.to_room));
                }
            }

            rooms.push(Room {
                spawn: raw_room.spawn,
                barrier_tiles: raw_room
                    .barrier_tiles
                    .into_iter()
                    .map(|t| (t.x, t.y))
                    .collect(),
                teleports: raw_room.teleports,
            });
        }

        Ok(Self { rooms })
    }

    /// Number of rooms declared by this realm. Always ≥ 1 for a successfully
    /// parsed map.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Whether `room_index` names a room that exists in this realm.
    pub fn has_room(&self, room_index: u32) -> bool {
        (room_index as usize) < self.rooms.len()
    }

    /// Spawn coordinates for the default room (index 0).
    pub fn default_spawn(&self) -> (f64, f64) {
        self.rooms[0].spawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(rooms_json: &str) -> String {
        format!(r#"{{"rooms": {rooms_json}}}"#)
    }

    #[test]
    fn parses_minimal_single_room() {
        let map = RealmMap::parse(&sample(r#"[{"spawn": [0.0, 0.0]}]"#)).unwrap();
        assert_eq!(map.room_count(), 1);
        assert_eq!(map.default_spawn(), (0.0, 0.0));
        assert!(map.has_room(0));
        assert!(!map.has_room(1));
    }

    #[test]
    fn rejects_malformed_json() {
        assert_eq!(RealmMap::parse("not json").unwrap_err(), RealmMapError::Malformed);
    }

    #[test]
    fn rejects_zero_rooms() {
        assert_eq!(
            RealmMap::parse(&sample("[]")).unwrap_err(),
            RealmMapError::NoRooms
        );
    }

    #[test]
    fn rejects_non_finite_spawn() {
        let json = sample(r#"[{"spawn": [null, 0.0]}]"#);
        // null coerces to a type error under serde, which is still "malformed"
        assert!(RealmMap::parse(&json).is_err());
    }

    #[test]
    fn rejects_teleport_to_missing_room() {
        let json = sample(
            r#"[{"spawn": [0.0, 0.0], "teleports": [{"from_x": 1, "from_y": 1, "to_room": 5, "to_x": 0.0, "to_y": 0.0}]}]"#,
        );
        assert_eq!(
            RealmMap::parse(&json).unwrap_err(),
            RealmMapError::BadTeleportTarget(0, 5)
        );
    }

    #[test]
    fn parses_multi_room_with_teleport() {
        let json = sample(
            r#"[
                {"spawn": [0.0, 0.0], "teleports": [{"from_x": 10, "from_y": 10, "to_room": 1, "to_x": 5.0, "to_y": 5.0}]},
                {"spawn": [1.0, 1.0]}
            ]"#,
        );
        let map = RealmMap::parse(&json).unwrap();
        assert_eq!(map.room_count(), 2);
        assert_eq!(map.rooms[0].teleports[0].to_room, 1);
    }
}
