//! Per-connection event handling: the join protocol and per-message
//! dispatch.
//!
//! Grounded on the teacher's `server::message_router` (one method per
//! inbound variant, delegating to a handler) and `server::room_service`
//! (validate → rate-limit → authorize → mutate → fan out), generalized from
//! room/lobby semantics to realm/session/proximity semantics. Outbound
//! delivery is expressed as an `Outbox` of `(SocketId, ServerMessage)` pairs
//! rather than direct socket writes, so the join protocol and message
//! handlers are testable without a running transport — the websocket layer
//! is the only thing that actually writes to a socket.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    Principal as DomainPrincipal, RealmId, RealmMap, Session, SessionError, SessionManager,
    SocketId, UserId, UserRegistry,
};
use crate::protocol::{
    validate_chat_message, validate_coordinates, validate_room_index, validate_share_id,
    validate_skin, ClientMessage, ErrorCode, PlayerView, RealmInfo, RoomJoinedPayload,
    ServerMessage, TerminationCode,
};
use crate::rate_limit::RateLimiter;

use super::identity::Principal;
use super::metrics::ServerMetrics;
use super::realm_store::{RealmStore, StoreError};

/// One outbound frame addressed to a specific socket.
pub type Outbox = Vec<(SocketId, ServerMessage)>;

pub struct Dispatcher {
    pub sessions: SessionManager,
    pub users: UserRegistry,
    pub store: Arc<dyn RealmStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics: Arc<ServerMetrics>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn RealmStore>, rate_limiter: Arc<RateLimiter>, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            sessions: SessionManager::new(),
            users: UserRegistry::new(),
            store,
            rate_limiter,
            metrics,
        }
    }

    /// Registers a successfully authenticated connection. Call after the
    /// handshake's `VerifyToken` succeeds, before accepting any messages.
    pub fn register_connection(&self, principal: &Principal, socket_id: SocketId) {
        self.users.insert(DomainPrincipal {
            user_id: principal.user_id,
            username: principal.username.clone(),
            socket_id,
        });
    }

    /// The join protocol (§4.6). Returns the outbound frames to deliver:
    /// on failure a single `joinFailed` to the originator; on success the
    /// originator's `joinedRoom` plus the room's `playerJoinedRoom` fan-out
    /// in both directions, plus a kick frame for a duplicate prior session.
    pub async fn handle_join(
        &self,
        user_id: UserId,
        username: &str,
        socket_id: SocketId,
        realm_id: RealmId,
        share_id: Option<&str>,
    ) -> Outbox {
        if !self.rate_limiter.check(user_id, "joinRealm") {
            return vec![(socket_id, rate_limited_frame("joinRealm"))];
        }

        let Some(_guard) = self.sessions.begin_join(user_id) else {
            return vec![(
                socket_id,
                ServerMessage::JoinFailed("Already joining a space.".into()),
            )];
        };

        let share_id = match validate_share_id(share_id) {
            Ok(id) => id,
            Err(_) => return vec![(socket_id, ServerMessage::JoinFailed("Invalid share link.".into()))],
        };

        let record = match self.store.load_realm(realm_id).await {
            Ok(record) => record,
            Err(StoreError::RealmNotFound(_) | StoreError::ProfileNotFound(_)) => {
                return vec![(socket_id, ServerMessage::JoinFailed("Space not found".into()))]
            }
        };

        let profile = match self.store.load_profile(user_id).await {
            Ok(profile) => profile,
            Err(_) => {
                return vec![(
                    socket_id,
                    ServerMessage::JoinFailed("Failed to get profile".into()),
                )]
            }
        };

        if let Err(reason) = authorize_join(user_id, record.owner_id, record.share_id, share_id) {
            return vec![(socket_id, ServerMessage::JoinFailed(reason))];
        }

        let realm_map = match RealmMap::parse(&record.map_data) {
            Ok(map) => Arc::new(map),
            Err(err) => {
                warn!(%realm_id, %err, "realm map failed to parse");
                return vec![(socket_id, ServerMessage::JoinFailed("Space not found".into()))];
            }
        };

        let mut outbox = Outbox::new();

        if let Some(previous_realm) = self.sessions.realm_of(user_id) {
            if let Some(removed) = self.sessions.remove_player(previous_realm, user_id).await {
                outbox.push((
                    removed.socket_id,
                    ServerMessage::SessionTerminated {
                        code: TerminationCode::OwnerKicked,
                        reason: "You have logged in from another location.".into(),
                    },
                ));
                self.broadcast_player_left(previous_realm, removed.room_index, user_id, &mut outbox)
                    .await;
            }
        }

        let session_handle = self.sessions.get_or_create(realm_id, realm_map);
        let (new_player, existing_views) = {
            let mut session = session_handle.lock().await;
            let (new_player, changes) =
                session.add_player(socket_id, user_id, username.to_string(), profile.skin.clone());
            let existing: Vec<PlayerView> = session
                .players_in_room(new_player.room_index)
                .into_iter()
                .filter(|p| p.user_id != user_id)
                .map(PlayerView::from)
                .collect();
            append_proximity_updates(&session, &changes.changed, &mut outbox);
            (new_player, existing)
        };
        self.sessions.bind_reverse(user_id, realm_id);

        outbox.push((
            socket_id,
            ServerMessage::JoinedRoom(Box::new(RoomJoinedPayload {
                realm: RealmInfo {
                    id: realm_id,
                    owner_id: record.owner_id,
                },
                player: PlayerView::from(&new_player),
                room_index: new_player.room_index,
            })),
        ));

        for existing in &existing_views {
            outbox.push((socket_id, ServerMessage::PlayerJoinedRoom(Box::new(existing.clone()))));
        }

        {
            let session = session_handle.lock().await;
            for target_socket in session.sockets_in_room(new_player.room_index) {
                if target_socket != socket_id {
                    outbox.push((
                        target_socket,
                        ServerMessage::PlayerJoinedRoom(Box::new(PlayerView::from(&new_player))),
                    ));
                }
            }
        }

        outbox
    }

    /// Dispatches one already-authenticated inbound message. Errors never
    /// escape this boundary: each branch decides for itself whether to
    /// reply, drop silently, or emit a rate-limit error.
    pub async fn handle_message(&self, user_id: UserId, message: ClientMessage) -> Outbox {
        let event = message.event_name();
        if !self.rate_limiter.check(user_id, event) {
            return match self.socket_of(user_id) {
                Some(socket_id) => vec![(socket_id, rate_limited_frame(event))],
                None => Outbox::new(),
            };
        }

        let Some(session_handle) = self.sessions.session_of(user_id) else {
            return Outbox::new();
        };

        match message {
            // Re-joins mid-session are handled by `handle_join`, invoked
            // directly by the websocket layer; this event reaching the
            // generic dispatch loop means a client sent it while already
            // connected, which the single-flight guard makes harmless but
            // this loop has no session-mutating role for it.
            ClientMessage::JoinRealm { .. } => Outbox::new(),
            ClientMessage::MovePlayer { x, y } => {
                if validate_coordinates(x, y).is_err() {
                    return Outbox::new();
                }
                self.apply_move(user_id, &session_handle, x, y).await
            }
            ClientMessage::Teleport { x, y, room_index } => {
                let Ok(room_index) = validate_room_index(room_index) else {
                    return Outbox::new();
                };
                if validate_coordinates(x, y).is_err() {
                    return Outbox::new();
                }
                self.apply_teleport(user_id, &session_handle, x, y, room_index).await
            }
            ClientMessage::ChangedSkin(skin) => {
                if validate_skin(&skin).is_err() {
                    return Outbox::new();
                }
                self.apply_skin_change(user_id, &session_handle, skin).await
            }
            ClientMessage::SendMessage(raw) => {
                let Ok(message) = validate_chat_message(&raw) else {
                    return Outbox::new();
                };
                self.apply_chat(user_id, &session_handle, message).await
            }
            ClientMessage::KickPlayer { uid } => self.apply_kick(user_id, uid).await,
        }
    }

    /// Removes the player owning `socket_id`, if any, broadcasting
    /// `playerLeftRoom` to the rest of its room and clearing the user
    /// registry entry.
    pub async fn handle_disconnect(&self, socket_id: SocketId) -> Outbox {
        let mut outbox = Outbox::new();
        if let Some(removed) = self.sessions.log_out_by_socket_id(socket_id).await {
            self.broadcast_player_left(removed.realm_id, removed.room_index, removed.user_id, &mut outbox)
                .await;
            self.users.remove(removed.user_id);
        }
        outbox
    }

    /// Evicts every player in `realm_id` with a terminal frame, used when
    /// the realm's persisted record changes or is deleted out from under
    /// an active session.
    pub async fn evict_realm(&self, realm_id: RealmId, code: TerminationCode, reason: &str) -> Outbox {
        let removed = self.sessions.evict_realm(realm_id).await;
        removed
            .into_iter()
            .map(|r| {
                self.metrics.record_eviction();
                self.users.remove(r.user_id);
                (
                    r.socket_id,
                    ServerMessage::SessionTerminated {
                        code,
                        reason: reason.to_string(),
                    },
                )
            })
            .collect()
    }

    fn socket_of(&self, user_id: UserId) -> Option<SocketId> {
        self.users.get(user_id).map(|p| p.socket_id)
    }

    async fn apply_move(&self, user_id: UserId, session_handle: &Arc<Mutex<Session>>, x: f64, y: f64) -> Outbox {
        let mut session = session_handle.lock().await;
        let Ok(changes) = session.move_player(user_id, x, y) else {
            return Outbox::new();
        };
        let room_index = session.player(user_id).map(|p| p.room_index).unwrap_or_default();
        let mut outbox = fan_out_room(
            &session,
            room_index,
            user_id,
            ServerMessage::PlayerMoved { uid: user_id, x, y },
        );
        append_proximity_updates(&session, &changes.changed, &mut outbox);
        outbox
    }

    async fn apply_teleport(
        &self,
        user_id: UserId,
        session_handle: &Arc<Mutex<Session>>,
        x: f64,
        y: f64,
        room_index: u32,
    ) -> Outbox {
        let mut session = session_handle.lock().await;
        let old_room = session.player(user_id).map(|p| p.room_index);
        let changes = match session.change_room(user_id, room_index, x, y) {
            Ok(changes) => changes,
            Err(SessionError::BadRoom(_) | SessionError::UnknownPlayer(_)) => return Outbox::new(),
        };

        let message = ServerMessage::PlayerTeleported { uid: user_id, x, y, room_index };
        let mut outbox = Outbox::new();
        if let Some(old_room) = old_room {
            outbox.extend(fan_out_room(&session, old_room, user_id, message.clone()));
        }
        outbox.extend(fan_out_room(&session, room_index, user_id, message));
        append_proximity_updates(&session, &changes.changed, &mut outbox);
        outbox
    }

    async fn apply_skin_change(&self, user_id: UserId, session_handle: &Arc<Mutex<Session>>, skin: String) -> Outbox {
        let mut session = session_handle.lock().await;
        if session.set_skin(user_id, skin.clone()).is_err() {
            return Outbox::new();
        }
        let room_index = session.player(user_id).map(|p| p.room_index).unwrap_or_default();
        fan_out_room(
            &session,
            room_index,
            user_id,
            ServerMessage::PlayerChangedSkin { uid: user_id, skin },
        )
    }

    async fn apply_chat(&self, user_id: UserId, session_handle: &Arc<Mutex<Session>>, message: String) -> Outbox {
        let session = session_handle.lock().await;
        let room_index = session.player(user_id).map(|p| p.room_index).unwrap_or_default();
        fan_out_room(
            &session,
            room_index,
            user_id,
            ServerMessage::ReceiveMessage { uid: user_id, message },
        )
    }

    /// `kickPlayer` is only honored if the issuer is the realm's owner.
    async fn apply_kick(&self, issuer: UserId, target: UserId) -> Outbox {
        let Some(realm_id) = self.sessions.realm_of(issuer) else {
            return Outbox::new();
        };
        let Ok(record) = self.store.load_realm(realm_id).await else {
            return Outbox::new();
        };
        if record.owner_id != issuer {
            return Outbox::new();
        }

        let mut outbox = Outbox::new();
        if let Some(removed) = self.sessions.remove_player(realm_id, target).await {
            self.metrics.record_eviction();
            outbox.push((
                removed.socket_id,
                ServerMessage::SessionTerminated {
                    code: TerminationCode::OwnerKicked,
                    reason: "Removed by the realm owner.".into(),
                },
            ));
            self.broadcast_player_left(realm_id, removed.room_index, target, &mut outbox).await;
            self.users.remove(target);
        }
        outbox
    }

    async fn broadcast_player_left(&self, realm_id: RealmId, room_index: u32, user_id: UserId, outbox: &mut Outbox) {
        if let Some(session_handle) = self.sessions.session_by_realm(realm_id) {
            let session = session_handle.lock().await;
            for target in session.sockets_in_room(room_index) {
                outbox.push((target, ServerMessage::PlayerLeftRoom { uid: user_id }));
            }
        }
    }
}

fn fan_out_room(session: &Session, room_index: u32, exclude_player: UserId, message: ServerMessage) -> Outbox {
    session
        .players_in_room(room_index)
        .into_iter()
        .filter(|p| p.user_id != exclude_player)
        .map(|p| (p.socket_id, message.clone()))
        .collect()
}

fn append_proximity_updates(session: &Session, changed: &HashSet<UserId>, outbox: &mut Outbox) {
    for &user_id in changed {
        if let Some(player) = session.player(user_id) {
            outbox.push((player.socket_id, ServerMessage::proximity_update(player.proximity_id)));
        }
    }
}

fn authorize_join(
    user_id: UserId,
    owner_id: UserId,
    realm_share_id: Option<Uuid>,
    supplied_share_id: Option<Uuid>,
) -> Result<(), String> {
    if user_id == owner_id {
        return Ok(());
    }
    let Some(realm_share_id) = realm_share_id else {
        return Ok(());
    };
    let Some(supplied) = supplied_share_id else {
        return Err("This realm requires a share link.".into());
    };
    if supplied != realm_share_id {
        return Err("The share link has been changed.".into());
    }
    Ok(())
}

fn rate_limited_frame(event: &str) -> ServerMessage {
    ServerMessage::Error {
        event: event.to_string(),
        code: ErrorCode::RateLimited,
        message: ErrorCode::RateLimited.description().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateLimitConfig;
    use crate::server::realm_store::InMemoryRealmStore;

    fn dispatcher_with_store() -> (Dispatcher, Arc<InMemoryRealmStore>) {
        let store = Arc::new(InMemoryRealmStore::new());
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));
        let metrics = Arc::new(ServerMetrics::new());
        let dispatcher = Dispatcher::new(store.clone(), limiter, metrics);
        (dispatcher, store)
    }

    #[tokio::test]
    async fn join_unknown_realm_fails() {
        let (dispatcher, _store) = dispatcher_with_store();
        let outbox = dispatcher
            .handle_join(Uuid::new_v4(), "alice", Uuid::new_v4(), Uuid::new_v4(), None)
            .await;
        assert_eq!(outbox.len(), 1);
        assert!(matches!(outbox[0].1, ServerMessage::JoinFailed(_)));
    }

    #[tokio::test]
    async fn solo_join_to_public_realm_succeeds() {
        let (dispatcher, store) = dispatcher_with_store();
        let realm_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        store.put_realm(realm_id, owner_id, None, r#"{"rooms":[{"spawn":[0.0,0.0]}]}"#);
        store.put_profile(user_id, "alice", "default");

        let outbox = dispatcher
            .handle_join(user_id, "alice", Uuid::new_v4(), realm_id, None)
            .await;
        assert_eq!(outbox.len(), 1);
        assert!(matches!(outbox[0].1, ServerMessage::JoinedRoom(_)));
    }

    #[tokio::test]
    async fn shared_realm_rejects_missing_share_id() {
        let (dispatcher, store) = dispatcher_with_store();
        let realm_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let share_id = Uuid::new_v4();
        store.put_realm(realm_id, owner_id, Some(share_id), r#"{"rooms":[{"spawn":[0.0,0.0]}]}"#);
        store.put_profile(user_id, "alice", "default");

        let outbox = dispatcher
            .handle_join(user_id, "alice", Uuid::new_v4(), realm_id, None)
            .await;
        assert_eq!(outbox.len(), 1);
        assert!(matches!(&outbox[0].1, ServerMessage::JoinFailed(reason) if reason.contains("requires a share link")));
    }

    #[tokio::test]
    async fn duplicate_login_kicks_previous_socket() {
        let (dispatcher, store) = dispatcher_with_store();
        let realm_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        store.put_realm(realm_id, owner_id, None, r#"{"rooms":[{"spawn":[0.0,0.0]}]}"#);
        store.put_profile(user_id, "alice", "default");

        let socket_a = Uuid::new_v4();
        dispatcher.handle_join(user_id, "alice", socket_a, realm_id, None).await;

        let socket_b = Uuid::new_v4();
        let outbox = dispatcher.handle_join(user_id, "alice", socket_b, realm_id, None).await;

        assert!(outbox.iter().any(|(socket, msg)| *socket == socket_a
            && matches!(msg, ServerMessage::SessionTerminated { .. })));
        assert!(outbox.iter().any(|(socket, msg)| *socket == socket_b
            && matches!(msg, ServerMessage::JoinedRoom(_))));
    }

    #[tokio::test]
    async fn move_player_fans_out_to_room_excluding_self() {
        let (dispatcher, store) = dispatcher_with_store();
        let realm_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        store.put_realm(realm_id, owner_id, None, r#"{"rooms":[{"spawn":[0.0,0.0]}]}"#);

        let a = Uuid::new_v4();
        store.put_profile(a, "a", "default");
        let socket_a = Uuid::new_v4();
        dispatcher.handle_join(a, "a", socket_a, realm_id, None).await;

        let b = Uuid::new_v4();
        store.put_profile(b, "b", "default");
        let socket_b = Uuid::new_v4();
        dispatcher.handle_join(b, "b", socket_b, realm_id, None).await;

        let outbox = dispatcher
            .handle_message(a, ClientMessage::MovePlayer { x: 10.0, y: 10.0 })
            .await;
        assert!(outbox.iter().any(|(socket, msg)| *socket == socket_b
            && matches!(msg, ServerMessage::PlayerMoved { .. })));
        assert!(!outbox
            .iter()
            .any(|(socket, msg)| *socket == socket_a && matches!(msg, ServerMessage::PlayerMoved { .. })));
    }

    #[tokio::test]
    async fn kick_player_requires_owner() {
        let (dispatcher, store) = dispatcher_with_store();
        let realm_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        store.put_realm(realm_id, owner_id, None, r#"{"rooms":[{"spawn":[0.0,0.0]}]}"#);

        let bystander = Uuid::new_v4();
        store.put_profile(bystander, "b", "default");
        dispatcher.handle_join(bystander, "b", Uuid::new_v4(), realm_id, None).await;

        let target = Uuid::new_v4();
        store.put_profile(target, "t", "default");
        dispatcher.handle_join(target, "t", Uuid::new_v4(), realm_id, None).await;

        // `bystander` is not the owner, so the kick is a no-op.
        let outbox = dispatcher.handle_message(bystander, ClientMessage::KickPlayer { uid: target }).await;
        assert!(outbox.is_empty());
    }
}
