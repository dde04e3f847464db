use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};

use super::filters;
use crate::error::{ConfigError, ConfigResult};

/// Формат вывода событий.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Период ротации файлового лога.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

/// Файловый sink (через `tracing-appender`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    pub directory: PathBuf,
    pub filename_prefix: String,
    pub rotation: Rotation,
    pub format: LogFormat,
}

/// Конфигурация логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовый уровень (`trace`..`error`).
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
    /// Переопределения уровня по target, например `postbox::pubsub = "trace"`.
    pub targets: BTreeMap<String, String>,
    /// Файловый вывод; `None`: только консоль.
    pub file: Option<FileSinkConfig>,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            filename_prefix: "postbox.log".to_string(),
            rotation: Rotation::Daily,
            format: LogFormat::Json,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
            targets: BTreeMap::new(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Директива `EnvFilter`: базовый уровень + переопределения по target.
    pub fn build_filter_directive(&self) -> String {
        std::iter::once(self.level.clone())
            .chain(self.targets.iter().map(|(t, l)| format!("{t}={l}")))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn validate(&self) -> ConfigResult<()> {
        filters::filter_from_directive(&self.build_filter_directive())?;

        if let Some(file) = &self.file {
            if file.filename_prefix.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: "logging.file.filename_prefix",
                    reason: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(LoggingConfig::default().build_filter_directive(), "info");
    }

    #[test]
    fn test_directive_with_targets() {
        let cfg = LoggingConfig {
            level: "warn".into(),
            targets: BTreeMap::from([
                ("postbox::pubsub".to_string(), "trace".to_string()),
                ("tokio".to_string(), "error".to_string()),
            ]),
            ..Default::default()
        };
        assert_eq!(
            cfg.build_filter_directive(),
            "warn,postbox::pubsub=trace,tokio=error"
        );
        assert!(cfg.validate().is_ok());
    }

    /// Тест проверяет, что некорректный уровень отклоняется.
    #[test]
    fn test_validate_rejects_bad_level() {
        let cfg = LoggingConfig {
            targets: BTreeMap::from([("postbox".to_string(), "loud".to_string())]),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Filter { .. })));
    }

    #[test]
    fn test_validate_rejects_empty_file_prefix() {
        let cfg = LoggingConfig {
            file: Some(FileSinkConfig {
                filename_prefix: " ".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { .. })));
    }
}
