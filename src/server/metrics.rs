//! Process-wide counters, trimmed from the teacher's `metrics::ServerMetrics`
//! down to the handful this design's ambient stack actually needs (no
//! Prometheus exporter: SPEC_FULL's Non-goals exclude an outer metrics
//! surface, only the counters themselves are ambient).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct ServerMetrics {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    realms_created: AtomicU64,
    messages_dispatched: AtomicU64,
    messages_rejected: AtomicU64,
    players_evicted: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_realm_created(&self) {
        self.realms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.messages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.players_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            realms_created: self.realms_created.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            messages_rejected: self.messages_rejected.load(Ordering::Relaxed),
            players_evicted: self.players_evicted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub realms_created: u64,
    pub messages_dispatched: u64,
    pub messages_rejected: u64,
    pub players_evicted: u64,
}
