//! Layered configuration: compiled defaults, JSON file, environment overrides.

mod defaults;
mod loader;
mod logging;
mod server;
mod types;
mod validation;

pub use loader::{load, ConfigError};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use server::{RateLimitConfig, ServerConfig};
pub use types::{Config, SecurityConfig};
pub use validation::{is_production_mode, validate, ConfigValidationError};
