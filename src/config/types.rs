//! The root configuration tree: one struct per concern, aggregated here.

use serde::{Deserialize, Serialize};

use super::defaults::{default_cors_origins, default_max_message_size, default_port};
use super::logging::LoggingConfig;
use super::server::{RateLimitConfig, ServerConfig};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Comma-separated list of allowed CORS origins.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// Incoming WebSocket text frames larger than this are rejected.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl SecurityConfig {
    pub fn allowed_origins(&self) -> Vec<&str> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            server: ServerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.port, cfg.port);
    }

    #[test]
    fn deserializes_from_empty_object() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.port, default_port());
        assert_eq!(cfg.server.max_connections_per_ip, 10);
    }

    #[test]
    fn parses_cors_origin_list() {
        let cfg = SecurityConfig {
            cors_origins: "http://a.example, http://b.example".to_string(),
            ..SecurityConfig::default()
        };
        assert_eq!(cfg.allowed_origins(), vec!["http://a.example", "http://b.example"]);
    }
}
