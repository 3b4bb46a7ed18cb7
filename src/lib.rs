//! Coordination server for real-time multi-user virtual spaces ("realms"):
//! session/room state, event dispatch, and proximity-based peer pairing for
//! audio/video calls.
//!
//! Layered the way the teacher structures a signaling server: `domain` holds
//! the pure in-memory state machine, `protocol` the wire format, `server`
//! the process-level glue (connection bookkeeping, identity, dispatch), and
//! `websocket` the transport boundary.

pub mod config;
pub mod domain;
pub mod logging;
pub mod protocol;
pub mod rate_limit;
pub mod server;
pub mod websocket;
