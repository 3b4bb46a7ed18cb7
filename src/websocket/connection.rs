//! Per-connection lifecycle: handshake, send/receive tasks, message
//! dispatch loop, disconnect cleanup.
//!
//! Grounded on the teacher's `websocket::connection::handle_socket`: split
//! the socket into a sender/receiver pair, register with the connection
//! manager, spawn a task draining an mpsc channel into the socket, and run
//! the receive loop in the current task. Trimmed of message batching (the
//! design has no throughput profile calling for it — every `Outbox` entry
//! is sent immediately, mirroring the teacher's non-batching mode) and of
//! SDK/app-id negotiation, which this design has no equivalent for.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::SocketId;
use crate::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::server::{IdentityError, RegisterClientError, RealmServer};

use super::handler::HandshakeParams;

pub async fn handle_socket(
    socket: WebSocket,
    server: Arc<RealmServer>,
    addr: SocketAddr,
    params: HandshakeParams,
) {
    let (mut sender, mut receiver) = socket.split();
    let socket_id: SocketId = uuid::Uuid::new_v4();

    let auth_timeout = Duration::from_secs(server.config.server.auth_timeout_secs);
    let deadline = Instant::now() + auth_timeout;
    let principal = match tokio::time::timeout_at(deadline, authenticate(&server, &params)).await {
        Ok(Ok(principal)) => principal,
        Ok(Err(reason)) => {
            let _ = send_one(&mut sender, &ServerMessage::Error {
                event: "joinRealm".into(),
                code: ErrorCode::AuthError,
                message: reason,
            })
            .await;
            let _ = sender.close().await;
            return;
        }
        Err(_) => {
            let _ = send_one(&mut sender, &ServerMessage::Error {
                event: "joinRealm".into(),
                code: ErrorCode::AuthError,
                message: "authentication timed out".into(),
            })
            .await;
            let _ = sender.close().await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(64);
    if let Err(RegisterClientError::IpLimitExceeded { current, limit }) =
        server.connections.register(socket_id, tx, addr.ip())
    {
        let _ = send_one(&mut sender, &ServerMessage::Error {
            event: "joinRealm".into(),
            code: ErrorCode::AuthError,
            message: format!("too many connections from your address ({current}/{limit})"),
        })
        .await;
        let _ = sender.close().await;
        return;
    }

    server.dispatcher.register_connection(&principal, socket_id);
    server.metrics.record_connection_opened();
    info!(%socket_id, user_id = %principal.user_id, %addr, "connection established");

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if send_one(&mut sender, &message).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let max_message_size = server.config.security.max_message_size;
    loop {
        let Some(frame) = receiver.next().await else {
            break;
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%socket_id, %err, "websocket error");
                break;
            }
        };

        match frame {
            Message::Text(text) => {
                if text.len() > max_message_size {
                    warn!(%socket_id, size = text.len(), max = max_message_size, "message exceeds size limit");
                    continue;
                }
                server.connections.touch(&socket_id);
                dispatch_text(&server, &principal, socket_id, &text).await;
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    let outbox = server.dispatcher.handle_disconnect(socket_id).await;
    server.connections.remove(&socket_id);
    server.metrics.record_connection_closed();
    deliver(&server, outbox).await;
    send_task.abort();
    debug!(%socket_id, "connection closed");
}

async fn authenticate(
    server: &Arc<RealmServer>,
    params: &HandshakeParams,
) -> Result<crate::server::Principal, String> {
    let (Some(token), Some(uid), Some(username)) =
        (&params.token, params.uid, &params.username)
    else {
        return Err("missing token, uid, or username".into());
    };
    server
        .identity
        .verify(token, uid, username)
        .await
        .map_err(|IdentityError::Unauthenticated| "token or claimed identity rejected".to_string())
}

async fn dispatch_text(server: &Arc<RealmServer>, principal: &crate::server::Principal, socket_id: SocketId, text: &str) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(err) => {
            server.metrics.record_rejected();
            debug!(%socket_id, %err, "dropped malformed frame");
            return;
        }
    };

    server.metrics.record_dispatched();
    let outbox = if let ClientMessage::JoinRealm { realm_id, share_id } = message {
        server
            .dispatcher
            .handle_join(principal.user_id, &principal.username, socket_id, realm_id, share_id.as_deref())
            .await
    } else {
        server.dispatcher.handle_message(principal.user_id, message).await
    };

    deliver(server, outbox).await;
}

async fn deliver(server: &Arc<RealmServer>, outbox: crate::server::Outbox) {
    for (target, message) in outbox {
        if let Some(sender) = server.connections.sender_for(&target) {
            if sender.send(Arc::new(message)).await.is_err() {
                debug!(socket_id = %target, "outbound channel closed before delivery");
            }
        }
    }
}

async fn send_one(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).expect("ServerMessage always serializes");
    sender.send(Message::Text(text.into())).await
}
