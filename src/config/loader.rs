//! Layered configuration loading: compiled defaults, then an optional JSON
//! file, then `REALM__`-prefixed environment variable overrides. Mirrors the
//! teacher's `config::loader` merge order.

use std::env;
use std::path::Path;

use super::types::Config;

const ENV_PREFIX: &str = "REALM__";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value for environment variable {key}: {value}")]
    InvalidEnvValue { key: String, value: String },
}

/// Loads configuration from an optional JSON file at `path`, then applies
/// `REALM__SECTION__FIELD`-style environment variable overrides on top.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = match path {
        Some(path) if path.exists() => {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        }
        _ => Config::default(),
    };

    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

fn apply_env_overrides(cfg: &mut Config) -> Result<(), ConfigError> {
    if let Some(v) = env_var("PORT") {
        cfg.port = parse_env(&v, "REALM__PORT")?;
    }
    if let Some(v) = env_var("SERVER__MAX_CONNECTIONS_PER_IP") {
        cfg.server.max_connections_per_ip = parse_env(&v, "REALM__SERVER__MAX_CONNECTIONS_PER_IP")?;
    }
    if let Some(v) = env_var("SERVER__INACTIVE_TIMEOUT_SECS") {
        cfg.server.inactive_timeout_secs = parse_env(&v, "REALM__SERVER__INACTIVE_TIMEOUT_SECS")?;
    }
    if let Some(v) = env_var("SERVER__PROXIMITY_RADIUS") {
        cfg.server.proximity_radius = parse_env(&v, "REALM__SERVER__PROXIMITY_RADIUS")?;
    }
    if let Some(v) = env_var("SERVER__COORDINATE_BOUND") {
        cfg.server.coordinate_bound = parse_env(&v, "REALM__SERVER__COORDINATE_BOUND")?;
    }
    if let Some(v) = env_var("LOGGING__DIR") {
        cfg.logging.dir = v;
    }
    if let Some(v) = env_var("LOGGING__ENABLE_FILE_LOGGING") {
        cfg.logging.enable_file_logging = parse_env(&v, "REALM__LOGGING__ENABLE_FILE_LOGGING")?;
    }
    if let Some(v) = env_var("SECURITY__CORS_ORIGINS") {
        cfg.security.cors_origins = v;
    }
    if let Some(v) = env_var("SECURITY__MAX_MESSAGE_SIZE") {
        cfg.security.max_message_size = parse_env(&v, "REALM__SECURITY__MAX_MESSAGE_SIZE")?;
    }

    Ok(())
}

fn env_var(suffix: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{suffix}")).ok()
}

fn parse_env<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
