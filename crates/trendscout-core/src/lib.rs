//! Shared domain types and configuration for the trendscout engine.

mod config;
mod engine_config;
mod platform;
mod record;

pub use config::{load_engine_config, load_engine_config_from_env};
pub use engine_config::{DelayRange, EngineConfig, ResultLimits};
pub use platform::{Platform, TimeRange};
pub use record::{ContentRecord, PlatformMetrics};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    FileParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unknown time range: {0} (expected 1d, 7d or 30d)")]
    UnknownTimeRange(String),
}
