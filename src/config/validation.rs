//! Startup sanity checks on a loaded `Config`, trimmed from the teacher's
//! `config::validation` (which also checked TLS cert paths and token-binding
//! secrets that this crate has no equivalent of).

use super::types::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("server.proximity_radius must be positive, got {0}")]
    NonPositiveProximityRadius(f64),
    #[error("server.coordinate_bound must be positive, got {0}")]
    NonPositiveCoordinateBound(f64),
    #[error("security.max_message_size must be positive")]
    ZeroMaxMessageSize,
    #[error("security.cors_origins must not be empty")]
    EmptyCorsOrigins,
}

pub fn validate(cfg: &Config) -> Result<(), ConfigValidationError> {
    if !(cfg.server.proximity_radius.is_finite() && cfg.server.proximity_radius > 0.0) {
        return Err(ConfigValidationError::NonPositiveProximityRadius(
            cfg.server.proximity_radius,
        ));
    }
    if !(cfg.server.coordinate_bound.is_finite() && cfg.server.coordinate_bound > 0.0) {
        return Err(ConfigValidationError::NonPositiveCoordinateBound(
            cfg.server.coordinate_bound,
        ));
    }
    if cfg.security.max_message_size == 0 {
        return Err(ConfigValidationError::ZeroMaxMessageSize);
    }
    if cfg.security.allowed_origins().is_empty() {
        return Err(ConfigValidationError::EmptyCorsOrigins);
    }
    Ok(())
}

/// Best-effort heuristic for whether this process looks like a production
/// deployment, used only to decide whether to warn about permissive defaults.
pub fn is_production_mode() -> bool {
    matches!(
        std::env::var("APP_ENV").as_deref(),
        Ok("production") | Ok("prod")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn rejects_zero_proximity_radius() {
        let mut cfg = Config::default();
        cfg.server.proximity_radius = 0.0;
        assert!(matches!(
            validate(&cfg),
            Err(ConfigValidationError::NonPositiveProximityRadius(_))
        ));
    }

    #[test]
    fn rejects_empty_cors_origins() {
        let mut cfg = Config::default();
        cfg.security.cors_origins = "   ".to_string();
        assert!(matches!(
            validate(&cfg),
            Err(ConfigValidationError::EmptyCorsOrigins)
        ));
    }
}
