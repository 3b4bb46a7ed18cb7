//! Ties the domain layer to a running process: connection bookkeeping,
//! identity verification, persisted-record lookups, and the per-connection
//! dispatcher, mirroring the teacher's `server::EnhancedGameServer` as the
//! god-object a websocket handler is built against.

pub mod connection_manager;
pub mod dispatcher;
pub mod identity;
pub mod metrics;
pub mod realm_store;

pub use connection_manager::{ConnectionManager, RegisterClientError};
pub use dispatcher::{Dispatcher, Outbox};
pub use identity::{IdentityError, IdentityProvider, Principal, TrustingIdentityProvider};
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use realm_store::{InMemoryRealmStore, ProfileRecord, RealmRecord, RealmStore, StoreError};

use std::sync::Arc;

use crate::config::Config;
use crate::rate_limit::RateLimiter;

/// Everything a websocket connection handler needs, bundled for
/// `axum::extract::State`.
pub struct RealmServer {
    pub config: Config,
    pub connections: ConnectionManager,
    pub dispatcher: Dispatcher,
    pub identity: Arc<dyn IdentityProvider>,
    pub metrics: Arc<ServerMetrics>,
}

impl RealmServer {
    pub fn new(config: Config, store: Arc<dyn RealmStore>, identity: Arc<dyn IdentityProvider>) -> Arc<Self> {
        let rate_limiter = Arc::new(RateLimiter::new((&config.rate_limit).into()));
        rate_limiter.clone().start_cleanup_task();

        let metrics = Arc::new(ServerMetrics::new());
        let connections = ConnectionManager::new(config.server.max_connections_per_ip);
        let dispatcher = Dispatcher::new(store, rate_limiter, metrics.clone());

        Arc::new(Self {
            config,
            connections,
            dispatcher,
            identity,
            metrics,
        })
    }

    /// Spawns the background sweep that force-closes connections idle past
    /// `server.inactive_timeout_secs`. Each eviction runs the same
    /// `handle_disconnect` path the websocket layer runs on a normal close,
    /// so the player's room learns of its departure immediately rather than
    /// waiting for the receive loop to notice the channel went away. The
    /// evicted socket id is still forwarded on the returned channel so the
    /// websocket layer can drop its own bookkeeping for that connection.
    pub fn start_idle_sweep(self: &Arc<Self>) -> tokio::sync::mpsc::Receiver<uuid::Uuid> {
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let server = Arc::clone(self);
        let interval = std::time::Duration::from_secs(server.config.server.cleanup_interval_secs);
        let idle_timeout = std::time::Duration::from_secs(server.config.server.inactive_timeout_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                for socket_id in server.connections.collect_expired(idle_timeout) {
                    let outbox = server.dispatcher.handle_disconnect(socket_id).await;
                    for (target, message) in outbox {
                        if let Some(sender) = server.connections.sender_for(&target) {
                            let _ = sender.send(Arc::new(message)).await;
                        }
                    }
                    if tx.send(socket_id).await.is_err() {
                        return;
                    }
                }
            }
        });
        rx
    }
}
