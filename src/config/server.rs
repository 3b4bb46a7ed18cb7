//! Server behavior configuration: connection limits, timeouts, and the
//! proximity/coordinate constants from §4.2 and §4.3.

use serde::{Deserialize, Serialize};

use super::defaults::{
    default_auth_timeout_secs, default_cleanup_interval_secs, default_coordinate_bound,
    default_inactive_timeout_secs, default_max_connections_per_ip, default_proximity_radius,
};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections accepted from a single source address.
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
    /// A connection with no traffic for this long is force-closed.
    #[serde(default = "default_inactive_timeout_secs")]
    pub inactive_timeout_secs: u64,
    /// Interval on which the inactivity sweep runs.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// How long a newly-opened socket has to complete the handshake before
    /// being force-closed.
    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,
    /// Two players within this many coordinate units are proximity-adjacent.
    #[serde(default = "default_proximity_radius")]
    pub proximity_radius: f64,
    /// Absolute value bound for `x`/`y`; coordinates outside
    /// `[-bound, +bound]` are rejected by the dispatcher.
    #[serde(default = "default_coordinate_bound")]
    pub coordinate_bound: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections_per_ip: default_max_connections_per_ip(),
            inactive_timeout_secs: default_inactive_timeout_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            auth_timeout_secs: default_auth_timeout_secs(),
            proximity_radius: default_proximity_radius(),
            coordinate_bound: default_coordinate_bound(),
        }
    }
}

/// Rate limiting configuration: the five per-event windows from §5.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "super::defaults::default_move_player_limit")]
    pub move_player_per_sec: u32,
    #[serde(default = "super::defaults::default_teleport_limit")]
    pub teleport_per_sec: u32,
    #[serde(default = "super::defaults::default_changed_skin_limit")]
    pub changed_skin_per_sec: u32,
    #[serde(default = "super::defaults::default_send_message_limit")]
    pub send_message_per_min: u32,
    #[serde(default = "super::defaults::default_join_realm_limit")]
    pub join_realm_per_min: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            move_player_per_sec: super::defaults::default_move_player_limit(),
            teleport_per_sec: super::defaults::default_teleport_limit(),
            changed_skin_per_sec: super::defaults::default_changed_skin_limit(),
            send_message_per_min: super::defaults::default_send_message_limit(),
            join_realm_per_min: super::defaults::default_join_realm_limit(),
        }
    }
}

impl From<&RateLimitConfig> for crate::rate_limit::RateLimitConfig {
    fn from(cfg: &RateLimitConfig) -> Self {
        use crate::rate_limit::EventLimit;
        use std::time::Duration;

        Self {
            move_player: EventLimit {
                max: cfg.move_player_per_sec,
                window: Duration::from_secs(1),
            },
            teleport: EventLimit {
                max: cfg.teleport_per_sec,
                window: Duration::from_secs(1),
            },
            changed_skin: EventLimit {
                max: cfg.changed_skin_per_sec,
                window: Duration::from_secs(1),
            },
            send_message: EventLimit {
                max: cfg.send_message_per_min,
                window: Duration::from_secs(60),
            },
            join_realm: EventLimit {
                max: cfg.join_realm_per_min,
                window: Duration::from_secs(60),
            },
        }
    }
}
