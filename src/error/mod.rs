use std::io;

use thiserror::Error;

pub use postbox_error::{EntityKind, ErrorExt, LogLevel, PubSubError, PubSubResult, StatusCode};

/// Ошибки загрузки конфигурации и инициализации логирования.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config source error: {0}")]
    Source(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid config value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Invalid log filter directive '{directive}': {reason}")]
    Filter { directive: String, reason: String },

    #[error("Logging already initialized: {0}")]
    LoggingInit(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
