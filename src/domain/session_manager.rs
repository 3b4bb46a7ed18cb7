//! Registry of live sessions keyed by realm id, with a reverse
//! user-id→realm-id index.
//!
//! Grounded on the teacher's `EnhancedGameServer` register/unregister
//! lifecycle (`server.rs`) and `ConnectionManager`'s `DashMap`-backed
//! registries (`server/connection_manager.rs`): lock-free concurrent maps
//! for the hot path, with each `Session`'s own state behind its own lock so
//! the dispatcher never holds two session locks at once.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::realm_map::RealmMap;
use super::session::{RealmId, Session, SocketId, UserId};

/// Terminal reason codes sent with `sessionTerminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvictionCode {
    RealmUpdated,
    RealmDeleted,
    OwnerKicked,
    ServerRestart,
}

/// A player removed from a session, for the caller to turn into broadcasts.
pub struct RemovedPlayer {
    pub realm_id: RealmId,
    pub room_index: u32,
    pub user_id: UserId,
    pub socket_id: SocketId,
    pub session_destroyed: bool,
}

/// Registry of live [`Session`]s keyed by realm id, plus the reverse
/// `user_id → realm_id` index required to resolve inbound messages to a
/// session in O(1) without scanning every session.
pub struct SessionManager {
    sessions: DashMap<RealmId, Arc<Mutex<Session>>>,
    reverse: DashMap<UserId, RealmId>,
    /// Per-user single-flight guard: a `user_id` present here has a join in
    /// progress. See [`JoinGuard`] for the RAII release discipline.
    joining: DashMap<UserId, ()>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            reverse: DashMap::new(),
            joining: DashMap::new(),
        }
    }

    /// Attempts to begin a join for `user_id`. Returns `None` if a join is
    /// already in progress (the caller should reject with a conflict
    /// error); otherwise returns a guard that clears the marker on drop,
    /// so it is released on every return path including early errors.
    pub fn begin_join(&self, user_id: UserId) -> Option<JoinGuard<'_>> {
        use dashmap::mapref::entry::Entry;
        match self.joining.entry(user_id) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(JoinGuard {
                    manager: self,
                    user_id,
                })
            }
        }
    }

    /// Returns the session realm id the given user currently belongs to,
    /// if any.
    pub fn realm_of(&self, user_id: UserId) -> Option<RealmId> {
        self.reverse.get(&user_id).map(|r| *r)
    }

    /// Returns the session handle for `user_id`, if logged in anywhere.
    pub fn session_of(&self, user_id: UserId) -> Option<Arc<Mutex<Session>>> {
        let realm_id = self.realm_of(user_id)?;
        self.sessions.get(&realm_id).map(|s| Arc::clone(&s))
    }

    /// Returns the live session handle for `realm_id`, if one exists.
    pub fn session_by_realm(&self, realm_id: RealmId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.get(&realm_id).map(|s| Arc::clone(&s))
    }

    /// Idempotently returns the session for `realm_id`, creating it (with
    /// the supplied realm snapshot) if it doesn't exist yet. If a session
    /// already exists, `realm` is ignored — the existing session owns the
    /// snapshot it was created with.
    pub fn get_or_create(&self, realm_id: RealmId, realm: Arc<RealmMap>) -> Arc<Mutex<Session>> {
        Arc::clone(
            self.sessions
                .entry(realm_id)
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(realm_id, realm)))),
        )
    }

    /// Registers `user_id` as now belonging to `realm_id` in the reverse
    /// index. Must be called after the player has actually been added to
    /// the session to preserve invariant 1 (`SessionOf` implies membership).
    pub fn bind_reverse(&self, user_id: UserId, realm_id: RealmId) {
        self.reverse.insert(user_id, realm_id);
    }

    /// Removes the player owning `socket_id` from whichever session it's
    /// in, and destroys that session if it becomes empty. Returns `None` if
    /// no player with that socket id was found.
    pub async fn log_out_by_socket_id(&self, socket_id: SocketId) -> Option<RemovedPlayer> {
        // Scan is acceptable here: this path only runs once per
        // disconnect, and session counts are small relative to connection
        // churn. A socket_id -> user_id index would add another map to
        // keep consistent for no real win at this scale.
        let mut target: Option<(RealmId, UserId)> = None;
        for entry in self.sessions.iter() {
            let session = entry.value().lock().await;
            for room in 0..session.realm.room_count() as u32 {
                if let Some(player) = session
                    .players_in_room(room)
                    .into_iter()
                    .find(|p| p.socket_id == socket_id)
                {
                    target = Some((*entry.key(), player.user_id));
                    break;
                }
            }
            if target.is_some() {
                break;
            }
        }

        let (realm_id, user_id) = target?;
        self.remove_player(realm_id, user_id).await
    }

    /// Forcibly removes `user_id` from its session, wherever it is. Used
    /// both by duplicate-login kicks and by `KickPlayer`.
    pub async fn remove_player(&self, realm_id: RealmId, user_id: UserId) -> Option<RemovedPlayer> {
        let session_handle = self.sessions.get(&realm_id).map(|s| Arc::clone(&s))?;

        let (room_index, socket_id, session_destroyed) = {
            let mut session = session_handle.lock().await;
            let Some(player) = session.player(user_id) else {
                return None;
            };
            let room_index = player.room_index;
            let socket_id = player.socket_id;
            session.remove_player(user_id);
            (room_index, socket_id, session.is_empty())
        };

        self.reverse.remove(&user_id);
        if session_destroyed {
            self.sessions.remove(&realm_id);
        }

        Some(RemovedPlayer {
            realm_id,
            room_index,
            user_id,
            socket_id,
            session_destroyed,
        })
    }

    /// Kicks every player in `realm_id`'s session and destroys it. Returns
    /// the list of removed players (socket ids included) so the caller can
    /// send each a terminal `sessionTerminated` frame before closing.
    pub async fn evict_realm(&self, realm_id: RealmId) -> Vec<RemovedPlayer> {
        let Some(session_handle) = self.sessions.get(&realm_id).map(|s| Arc::clone(&s)) else {
            return Vec::new();
        };

        let user_ids: HashSet<UserId> = {
            let session = session_handle.lock().await;
            (0..session.realm.room_count() as u32)
                .flat_map(|room| session.players_in_room(room).into_iter().map(|p| p.user_id).collect::<Vec<_>>())
                .collect()
        };

        let mut removed = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if let Some(r) = self.remove_player(realm_id, user_id).await {
                removed.push(r);
            }
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for the single-flight join lock described in §9 of the
/// design notes: the marker is removed on every exit path, including an
/// early `?`-propagated error, because `Drop` runs regardless.
pub struct JoinGuard<'a> {
    manager: &'a SessionManager,
    user_id: UserId,
}

impl Drop for JoinGuard<'_> {
    fn drop(&mut self) {
        self.manager.joining.remove(&self.user_id);
    }
}
