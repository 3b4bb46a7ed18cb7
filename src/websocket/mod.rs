//! The transport boundary: upgrades HTTP to a websocket and drives each
//! connection's handshake and message loop. Everything above this module
//! (domain, protocol, server::Dispatcher) is transport-agnostic; this is
//! the only place that touches an actual socket.

pub mod connection;
pub mod handler;

pub use handler::websocket_handler;
