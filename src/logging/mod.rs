pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{FileSinkConfig, LogFormat, LoggingConfig, Rotation};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{ConfigError, ConfigResult};

/// Инициализация логирования с конфигурацией.
///
/// Устанавливает глобальный subscriber: консоль всегда, файл, если
/// задан `config.file`. Повторный вызов возвращает
/// [`ConfigError::LoggingInit`].
pub fn init_logging(config: &LoggingConfig) -> ConfigResult<LoggingHandle> {
    config.validate()?;

    let env_filter = filters::build_filter_from_config(config)?;
    let mut layers = vec![sinks::console::layer_with_config(config)];

    let file_guard = match &config.file {
        Some(file) => {
            let (file_layer, guard) = sinks::file::layer_with_config(config, file)?;
            layers.push(file_layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| ConfigError::LoggingInit(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = ?config.format,
        file_enabled = file_guard.is_some(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
