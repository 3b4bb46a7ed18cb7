//! End-to-end scenarios driven straight at `Dispatcher`, the same boundary
//! the websocket layer calls into. Grounded on the teacher's
//! `integration_tests.rs` (register clients, join rooms, assert on the
//! messages each player would receive) generalized from room/lobby
//! semantics to realm/session/proximity semantics.

use std::sync::Arc;

use realm_server::domain::PROXIMITY_RADIUS;
use realm_server::protocol::{ClientMessage, ServerMessage};
use realm_server::rate_limit::{EventLimit, RateLimitConfig, RateLimiter};
use realm_server::server::{Dispatcher, InMemoryRealmStore, ServerMetrics};
use std::time::Duration;
use uuid::Uuid;

fn generous_rate_limits() -> RateLimitConfig {
    let limit = EventLimit {
        max: 10_000,
        window: Duration::from_secs(1),
    };
    RateLimitConfig {
        move_player: limit,
        teleport: limit,
        changed_skin: limit,
        send_message: limit,
        join_realm: limit,
    }
}

fn dispatcher() -> (Dispatcher, Arc<InMemoryRealmStore>) {
    let store = Arc::new(InMemoryRealmStore::new());
    let limiter = Arc::new(RateLimiter::new(generous_rate_limits()));
    let metrics = Arc::new(ServerMetrics::new());
    let dispatcher = Dispatcher::new(store.clone(), limiter, metrics);
    (dispatcher, store)
}

const MAP: &str = r#"{"rooms": [{"spawn": [0.0, 0.0]}]}"#;

#[tokio::test]
async fn two_players_join_same_realm_and_see_each_other() {
    let (dispatcher, store) = dispatcher();
    let realm_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    store.put_realm(realm_id, owner_id, None, MAP);

    let alice = Uuid::new_v4();
    store.put_profile(alice, "alice", "default");
    let alice_socket = Uuid::new_v4();
    let outbox = dispatcher.handle_join(alice, "alice", alice_socket, realm_id, None).await;
    assert!(matches!(outbox[0].1, ServerMessage::JoinedRoom(_)));

    let bob = Uuid::new_v4();
    store.put_profile(bob, "bob", "default");
    let bob_socket = Uuid::new_v4();
    let outbox = dispatcher.handle_join(bob, "bob", bob_socket, realm_id, None).await;

    // Bob's own JoinedRoom, a PlayerJoinedRoom describing Alice (already
    // present), and a PlayerJoinedRoom broadcast of Bob sent to Alice.
    assert!(outbox
        .iter()
        .any(|(socket, msg)| *socket == bob_socket && matches!(msg, ServerMessage::JoinedRoom(_))));
    assert!(outbox.iter().any(|(socket, msg)| *socket == bob_socket
        && matches!(msg, ServerMessage::PlayerJoinedRoom(p) if p.uid == alice)));
    assert!(outbox.iter().any(|(socket, msg)| *socket == alice_socket
        && matches!(msg, ServerMessage::PlayerJoinedRoom(p) if p.uid == bob)));

    // Both spawn at the same point, so Bob's join also pairs them up for
    // proximity audio/video — both sockets learn their new proximity id.
    assert!(outbox.iter().any(|(socket, msg)| *socket == alice_socket
        && matches!(msg, ServerMessage::ProximityUpdate { proximity_id: Some(_) })));
    assert!(outbox.iter().any(|(socket, msg)| *socket == bob_socket
        && matches!(msg, ServerMessage::ProximityUpdate { proximity_id: Some(_) })));
}

#[tokio::test]
async fn moving_within_proximity_radius_pairs_up() {
    let (dispatcher, store) = dispatcher();
    let realm_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    store.put_realm(realm_id, owner_id, None, MAP);

    let alice = Uuid::new_v4();
    store.put_profile(alice, "alice", "default");
    dispatcher.handle_join(alice, "alice", Uuid::new_v4(), realm_id, None).await;

    let bob = Uuid::new_v4();
    store.put_profile(bob, "bob", "default");
    dispatcher.handle_join(bob, "bob", Uuid::new_v4(), realm_id, None).await;

    let outbox = dispatcher
        .handle_message(alice, ClientMessage::MovePlayer { x: 1.0, y: 1.0 })
        .await;
    assert!(outbox.iter().any(|(_, msg)| matches!(
        msg,
        ServerMessage::ProximityUpdate { proximity_id: Some(other) } if *other == bob
    )));
}

#[tokio::test]
async fn moving_beyond_proximity_radius_breaks_pairing() {
    let (dispatcher, store) = dispatcher();
    let realm_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    store.put_realm(realm_id, owner_id, None, MAP);

    let alice = Uuid::new_v4();
    store.put_profile(alice, "alice", "default");
    dispatcher.handle_join(alice, "alice", Uuid::new_v4(), realm_id, None).await;

    let bob = Uuid::new_v4();
    store.put_profile(bob, "bob", "default");
    dispatcher.handle_join(bob, "bob", Uuid::new_v4(), realm_id, None).await;

    dispatcher.handle_message(alice, ClientMessage::MovePlayer { x: 1.0, y: 1.0 }).await;

    let far = PROXIMITY_RADIUS * 3.0;
    let outbox = dispatcher
        .handle_message(alice, ClientMessage::MovePlayer { x: far, y: far })
        .await;
    assert!(outbox.iter().any(|(_, msg)| matches!(
        msg,
        ServerMessage::ProximityUpdate { proximity_id: None }
    )));
}

#[tokio::test]
async fn disconnect_notifies_the_rest_of_the_room() {
    let (dispatcher, store) = dispatcher();
    let realm_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    store.put_realm(realm_id, owner_id, None, MAP);

    let alice = Uuid::new_v4();
    store.put_profile(alice, "alice", "default");
    let alice_socket = Uuid::new_v4();
    dispatcher.handle_join(alice, "alice", alice_socket, realm_id, None).await;

    let bob = Uuid::new_v4();
    store.put_profile(bob, "bob", "default");
    let bob_socket = Uuid::new_v4();
    dispatcher.handle_join(bob, "bob", bob_socket, realm_id, None).await;

    let outbox = dispatcher.handle_disconnect(alice_socket).await;
    assert!(outbox
        .iter()
        .any(|(socket, msg)| *socket == bob_socket && matches!(msg, ServerMessage::PlayerLeftRoom { uid } if *uid == alice)));
}

#[tokio::test]
async fn owner_kick_terminates_target_and_notifies_room() {
    let (dispatcher, store) = dispatcher();
    let realm_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    store.put_realm(realm_id, owner_id, None, MAP);
    store.put_profile(owner_id, "owner", "default");
    dispatcher.handle_join(owner_id, "owner", Uuid::new_v4(), realm_id, None).await;

    let target = Uuid::new_v4();
    store.put_profile(target, "target", "default");
    let target_socket = Uuid::new_v4();
    dispatcher.handle_join(target, "target", target_socket, realm_id, None).await;

    let outbox = dispatcher.handle_message(owner_id, ClientMessage::KickPlayer { uid: target }).await;
    assert!(outbox.iter().any(|(socket, msg)| *socket == target_socket
        && matches!(msg, ServerMessage::SessionTerminated { .. })));
}

#[tokio::test]
async fn rate_limited_join_produces_an_error_frame() {
    let store = Arc::new(InMemoryRealmStore::new());
    let tight_limits = RateLimitConfig {
        join_realm: EventLimit {
            max: 1,
            window: Duration::from_secs(60),
        },
        ..generous_rate_limits()
    };
    let limiter = Arc::new(RateLimiter::new(tight_limits));
    let metrics = Arc::new(ServerMetrics::new());
    let dispatcher = Dispatcher::new(store.clone(), limiter, metrics);

    let realm_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    store.put_realm(realm_id, owner_id, None, MAP);
    let user_id = Uuid::new_v4();
    store.put_profile(user_id, "alice", "default");

    dispatcher.handle_join(user_id, "alice", Uuid::new_v4(), realm_id, None).await;
    let outbox = dispatcher.handle_join(user_id, "alice", Uuid::new_v4(), realm_id, None).await;
    assert!(matches!(outbox[0].1, ServerMessage::Error { .. }));
}
