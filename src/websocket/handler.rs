//! Axum route handler: upgrades the HTTP connection and hands it to
//! [`super::connection::handle_socket`]. Grounded on the teacher's
//! `websocket::handler::websocket_handler`, trimmed of TLS client-certificate
//! fingerprinting and subprotocol-based token binding this design has no
//! equivalent for — the handshake here reads its bearer token and claimed
//! user id from query parameters instead.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

use crate::server::RealmServer;

use super::connection::handle_socket;

#[derive(Debug, Deserialize)]
pub struct HandshakeParams {
    pub token: Option<String>,
    pub uid: Option<Uuid>,
    pub username: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<RealmServer>>,
    Query(params): Query<HandshakeParams>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, server, addr, params))
}
