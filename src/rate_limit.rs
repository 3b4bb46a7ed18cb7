//! Per-`(userId, event)` rate limiting.
//!
//! Grounded on the teacher's `rate_limit::RoomRateLimiter`: a config struct,
//! a per-key entry tracking counters against a rolling window, and a
//! `DashMap`-backed limiter with a background cleanup task. Generalized
//! from "per-player room/join counters" to "per-player-per-event-kind
//! token buckets", since §5 pins five distinct per-event windows.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

/// One event kind's limit: `max` occurrences per `window`.
#[derive(Debug, Clone, Copy)]
pub struct EventLimit {
    pub max: u32,
    pub window: Duration,
}

/// The five per-event limits pinned by §5 of the design.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub move_player: EventLimit,
    pub teleport: EventLimit,
    pub changed_skin: EventLimit,
    pub send_message: EventLimit,
    pub join_realm: EventLimit,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            move_player: EventLimit {
                max: 60,
                window: Duration::from_secs(1),
            },
            teleport: EventLimit {
                max: 2,
                window: Duration::from_secs(1),
            },
            changed_skin: EventLimit {
                max: 1,
                window: Duration::from_secs(1),
            },
            send_message: EventLimit {
                max: 10,
                window: Duration::from_secs(60),
            },
            join_realm: EventLimit {
                max: 5,
                window: Duration::from_secs(60),
            },
        }
    }
}

impl RateLimitConfig {
    fn limit_for(&self, event: &str) -> Option<EventLimit> {
        match event {
            "movePlayer" => Some(self.move_player),
            "teleport" => Some(self.teleport),
            "changedSkin" => Some(self.changed_skin),
            "sendMessage" => Some(self.send_message),
            "joinRealm" => Some(self.join_realm),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct BucketEntry {
    count: u32,
    window_start: Instant,
}

/// Token-bucket rate limiter keyed by `(user_id, event_name)`.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<(Uuid, &'static str), BucketEntry>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    /// Checks and consumes one unit of `event`'s budget for `user_id`.
    /// Events with no configured limit always pass. Returns `true` if the
    /// request is allowed.
    pub fn check(&self, user_id: Uuid, event: &'static str) -> bool {
        let Some(limit) = self.config.limit_for(event) else {
            return true;
        };

        let mut entry = self
            .buckets
            .entry((user_id, event))
            .or_insert_with(|| BucketEntry {
                count: 0,
                window_start: Instant::now(),
            });

        if entry.window_start.elapsed() >= limit.window {
            entry.count = 0;
            entry.window_start = Instant::now();
        }

        if entry.count < limit.max {
            entry.count += 1;
            true
        } else {
            false
        }
    }

    /// Drops buckets untouched for 2x their configured window, so
    /// disconnected users don't accumulate memory forever.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.buckets.retain(|(_, event), entry| {
            let Some(limit) = self.config.limit_for(event) else {
                return true;
            };
            now.duration_since(entry.window_start) < limit.window * 2
        });
    }

    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                self.cleanup();
            }
        });
    }
}

/// Exposed for diagnostics/tests: a snapshot of a user's bucket state.
#[derive(Debug, Clone, Default)]
pub struct UserRateStats {
    pub counts: HashMap<&'static str, u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> RateLimitConfig {
        RateLimitConfig {
            move_player: EventLimit {
                max: 2,
                window: Duration::from_millis(50),
            },
            ..RateLimitConfig::default()
        }
    }

    #[test]
    fn allows_up_to_max_then_rejects() {
        let limiter = RateLimiter::new(fast_config());
        let user = Uuid::new_v4();
        assert!(limiter.check(user, "movePlayer"));
        assert!(limiter.check(user, "movePlayer"));
        assert!(!limiter.check(user, "movePlayer"));
    }

    #[test]
    fn independent_users_have_independent_buckets() {
        let limiter = RateLimiter::new(fast_config());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(limiter.check(a, "movePlayer"));
        assert!(limiter.check(a, "movePlayer"));
        assert!(!limiter.check(a, "movePlayer"));
        assert!(limiter.check(b, "movePlayer"));
    }

    #[test]
    fn unconfigured_event_always_allowed() {
        let limiter = RateLimiter::new(fast_config());
        let user = Uuid::new_v4();
        for _ in 0..100 {
            assert!(limiter.check(user, "someOtherEvent"));
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn window_resets_after_elapsed_time() {
        let limiter = RateLimiter::new(fast_config());
        let user = Uuid::new_v4();
        assert!(limiter.check(user, "movePlayer"));
        assert!(limiter.check(user, "movePlayer"));
        assert!(!limiter.check(user, "movePlayer"));

        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(limiter.check(user, "movePlayer"));
    }
}
