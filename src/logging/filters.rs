use tracing_subscriber::EnvFilter;

use super::config::LoggingConfig;
use crate::error::{ConfigError, ConfigResult};

/// Фильтр событий: `RUST_LOG`, если задан, иначе директива из
/// конфигурации.
pub fn build_filter_from_config(config: &LoggingConfig) -> ConfigResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(env_filter) => Ok(env_filter),
        Err(_) => filter_from_directive(&config.build_filter_directive()),
    }
}

pub fn filter_from_directive(directive: &str) -> ConfigResult<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| ConfigError::Filter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_directives() {
        assert!(filter_from_directive("info").is_ok());
        assert!(filter_from_directive("warn,postbox::pubsub=trace").is_ok());
    }

    #[test]
    fn test_invalid_directive_reports_input() {
        match filter_from_directive("postbox=verbose") {
            Err(ConfigError::Filter { directive, .. }) => {
                assert_eq!(directive, "postbox=verbose")
            }
            other => panic!("expected Filter error, got {other:?}"),
        }
    }
}
