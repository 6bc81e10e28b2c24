//! Error types shared across the toolkit

use thiserror::Error;

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Errors raised while loading or validating project configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("config is missing required field `{0}`")]
    MissingField(&'static str),
}
