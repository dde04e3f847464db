use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, ConfigResult},
    logging::LoggingConfig,
    pubsub::DEFAULT_MAILBOX_CAPACITY,
};

/// Настройки брокера.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubSubConfig {
    /// Ёмкость ящика для подписчиков, созданных без явного размера.
    pub default_mailbox_capacity: usize,
    pub logging: LoggingConfig,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            default_mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            logging: LoggingConfig::default(),
        }
    }
}

impl PubSubConfig {
    /// Значения по умолчанию + переменные окружения `POSTBOX_*`.
    ///
    /// Вложенные ключи разделяются `__`:
    /// `POSTBOX_LOGGING__LEVEL=debug`.
    pub fn load() -> ConfigResult<Self> {
        Self::build(None)
    }

    /// Как [`load`](Self::load), но сначала читает файл `path`
    /// (формат по расширению). Окружение перекрывает файл.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::build(Some(path.as_ref()))
    }

    fn build(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = Config::builder()
            .set_default("default_mailbox_capacity", DEFAULT_MAILBOX_CAPACITY as u64)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg: Self = builder
            .add_source(
                Environment::with_prefix("POSTBOX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_mailbox_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "default_mailbox_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.logging.validate()
    }
}
