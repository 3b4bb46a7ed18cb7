//! Default value functions for `#[serde(default = ...)]` fields, organized
//! by category as in the teacher's `config::defaults`.

use super::logging::LogFormat;

pub const fn default_port() -> u16 {
    8080
}

// Server defaults

pub const fn default_max_connections_per_ip() -> usize {
    10
}

pub const fn default_inactive_timeout_secs() -> u64 {
    1800 // 30 minutes
}

pub const fn default_cleanup_interval_secs() -> u64 {
    60
}

pub const fn default_auth_timeout_secs() -> u64 {
    10
}

// Proximity defaults

pub const fn default_proximity_radius() -> f64 {
    150.0
}

pub const fn default_coordinate_bound() -> f64 {
    10_000.0
}

// Rate limit defaults (per §5)

pub const fn default_move_player_limit() -> u32 {
    60
}

pub const fn default_teleport_limit() -> u32 {
    2
}

pub const fn default_changed_skin_limit() -> u32 {
    1
}

pub const fn default_send_message_limit() -> u32 {
    10
}

pub const fn default_join_realm_limit() -> u32 {
    5
}

// Logging defaults

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "server.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

// Security defaults

pub fn default_cors_origins() -> String {
    "http://localhost:3000".to_string()
}

pub const fn default_max_message_size() -> usize {
    16384
}
