//! Per-realm runtime state: the set of connected players, their positions,
//! and per-room proximity indexes.
//!
//! Grounded on the teacher's `protocol::room_state::Room` for shape (a
//! struct owning a player map plus mutation methods that return bool/Option
//! rather than panicking) but replaces its lobby/authority/spectator
//! machinery entirely with realm/room/position semantics.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use super::errors::SessionError;
use super::proximity::ProximityIndex;
use super::realm_map::RealmMap;

pub type UserId = Uuid;
pub type RealmId = Uuid;
pub type SocketId = Uuid;

/// Coordinates are rejected, not clamped, outside this range — a
/// misbehaving client should be observable rather than silently corrected.
pub const COORDINATE_MIN: f64 = -10_000.0;
pub const COORDINATE_MAX: f64 = 10_000.0;

/// Returns whether `(x, y)` is finite and within the allowed coordinate
/// range. Used by the dispatcher's payload validation, not by `Session`
/// itself (the session trusts values that reach it).
pub fn coordinates_in_range(x: f64, y: f64) -> bool {
    x.is_finite() && y.is_finite() && (COORDINATE_MIN..=COORDINATE_MAX).contains(&x) && (COORDINATE_MIN..=COORDINATE_MAX).contains(&y)
}

/// A connected player's mutable runtime state.
#[derive(Debug, Clone)]
pub struct Player {
    pub user_id: UserId,
    pub username: String,
    pub skin: String,
    pub socket_id: SocketId,
    pub room_index: u32,
    pub x: f64,
    pub y: f64,
    /// `None` means "no proximity group" (solo, or group dissolved).
    pub proximity_id: Option<UserId>,
}

/// The set of players whose `proximity_id` changed as a result of a mutator
/// call, keyed by room so the dispatcher can target `proximityUpdate`
/// notifications correctly even when a move spans two rooms.
#[derive(Debug, Default)]
pub struct ProximityChanges {
    pub changed: HashSet<UserId>,
}

impl ProximityChanges {
    fn merge(mut self, other: HashSet<UserId>) -> Self {
        self.changed.extend(other);
        self
    }
}

/// The in-memory runtime instance of one realm with at least one connected
/// player. Owned exclusively by [`crate::domain::session_manager::SessionManager`].
pub struct Session {
    pub realm_id: RealmId,
    pub realm: Arc<RealmMap>,
    players: HashMap<UserId, Player>,
    proximity: HashMap<u32, ProximityIndex>,
}

impl Session {
    pub fn new(realm_id: RealmId, realm: Arc<RealmMap>) -> Self {
        Self {
            realm_id,
            realm,
            players: HashMap::new(),
            proximity: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, user_id: UserId) -> Option<&Player> {
        self.players.get(&user_id)
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.players.contains_key(&user_id)
    }

    /// Adds a new player at room 0's spawn point. Returns the new player
    /// (cloned, since the room-0 proximity index borrows mutably during
    /// insertion) and the set of players whose proximity group changed,
    /// which always includes the newcomer unless it stayed solo.
    pub fn add_player(
        &mut self,
        socket_id: SocketId,
        user_id: UserId,
        username: String,
        skin: String,
    ) -> (Player, ProximityChanges) {
        let (spawn_x, spawn_y) = self.realm.default_spawn();
        let player = Player {
            user_id,
            username,
            skin,
            socket_id,
            room_index: 0,
            x: spawn_x,
            y: spawn_y,
            proximity_id: None,
        };
        self.players.insert(user_id, player.clone());

        let changed = self
            .proximity
            .entry(0)
            .or_default()
            .insert(user_id, spawn_x, spawn_y);
        self.apply_proximity_changes(&changed);

        (
            self.players[&user_id].clone(),
            ProximityChanges::default().merge(changed),
        )
    }

    /// Removes `user_id` from the player map and its room's proximity
    /// index. Returns the set of players whose group changed.
    pub fn remove_player(&mut self, user_id: UserId) -> ProximityChanges {
        let Some(player) = self.players.remove(&user_id) else {
            return ProximityChanges::default();
        };

        let changed = self
            .proximity
            .entry(player.room_index)
            .or_default()
            .remove(user_id);
        self.apply_proximity_changes(&changed);

        ProximityChanges::default().merge(changed)
    }

    /// Updates `user_id`'s position within its current room and
    /// recomputes that room's proximity groups. Caller is responsible for
    /// coordinate validation — `Session` trusts its inputs.
    pub fn move_player(
        &mut self,
        user_id: UserId,
        x: f64,
        y: f64,
    ) -> Result<ProximityChanges, SessionError> {
        let room_index = {
            let player = self
                .players
                .get_mut(&user_id)
                .ok_or(SessionError::UnknownPlayer(user_id))?;
            player.x = x;
            player.y = y;
            player.room_index
        };

        let changed = self
            .proximity
            .entry(room_index)
            .or_default()
            .move_player(user_id, x, y);
        self.apply_proximity_changes(&changed);

        Ok(ProximityChanges::default().merge(changed))
    }

    /// Moves `user_id` to `room_index` at `(x, y)`. Validates the target
    /// room exists in the realm. Removes the player from the old room's
    /// proximity index and inserts it into the new one; the returned
    /// change set is the union of both.
    pub fn change_room(
        &mut self,
        user_id: UserId,
        room_index: u32,
        x: f64,
        y: f64,
    ) -> Result<ProximityChanges, SessionError> {
        if !self.realm.has_room(room_index) {
            return Err(SessionError::BadRoom(room_index));
        }

        let old_room = {
            let player = self
                .players
                .get_mut(&user_id)
                .ok_or(SessionError::UnknownPlayer(user_id))?;
            let old_room = player.room_index;
            player.room_index = room_index;
            player.x = x;
            player.y = y;
            old_room
        };

        let mut changed = self.proximity.entry(old_room).or_default().remove(user_id);
        self.apply_proximity_changes(&changed);

        let new_changed = self
            .proximity
            .entry(room_index)
            .or_default()
            .insert(user_id, x, y);
        self.apply_proximity_changes(&new_changed);
        changed.extend(new_changed);

        Ok(ProximityChanges::default().merge(changed))
    }

    pub fn set_skin(&mut self, user_id: UserId, skin: String) -> Result<(), SessionError> {
        let player = self
            .players
            .get_mut(&user_id)
            .ok_or(SessionError::UnknownPlayer(user_id))?;
        player.skin = skin;
        Ok(())
    }

    pub fn players_in_room(&self, room_index: u32) -> Vec<&Player> {
        self.players
            .values()
            .filter(|p| p.room_index == room_index)
            .collect()
    }

    pub fn sockets_in_room(&self, room_index: u32) -> Vec<SocketId> {
        self.players_in_room(room_index)
            .into_iter()
            .map(|p| p.socket_id)
            .collect()
    }

    pub fn proximity_id_of(&self, user_id: UserId) -> Option<UserId> {
        self.players.get(&user_id).and_then(|p| p.proximity_id)
    }

    /// Writes the freshly recomputed `proximity_id` back onto each changed
    /// player's record. `ProximityIndex` is the source of truth for group
    /// membership; `Player::proximity_id` is a read-optimized mirror.
    fn apply_proximity_changes(&mut self, changed: &HashSet<UserId>) {
        for &user_id in changed {
            if let Some(player) = self.players.get(&user_id) {
                let new_id = self
                    .proximity
                    .get(&player.room_index)
                    .and_then(|index| index.group_of(user_id));
                if let Some(player) = self.players.get_mut(&user_id) {
                    player.proximity_id = new_id;
                }
            }
        }
    }
}
