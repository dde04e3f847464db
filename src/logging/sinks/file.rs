use std::fs;

use tracing_appender::{
    non_blocking,
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::{
    error::ConfigResult,
    logging::{
        config::{FileSinkConfig, LoggingConfig, Rotation},
        formatter,
    },
};

/// File layer: rolling-файл через non-blocking writer.
///
/// `WorkerGuard` нужно держать до завершения процесса, иначе хвост
/// буфера потеряется.
pub fn layer_with_config<S>(
    config: &LoggingConfig,
    file: &FileSinkConfig,
) -> ConfigResult<(Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fs::create_dir_all(&file.directory)?;

    let rotation = match file.rotation {
        Rotation::Minutely => rolling::Rotation::MINUTELY,
        Rotation::Hourly => rolling::Rotation::HOURLY,
        Rotation::Daily => rolling::Rotation::DAILY,
        Rotation::Never => rolling::Rotation::NEVER,
    };
    let appender = RollingFileAppender::new(rotation, &file.directory, &file.filename_prefix);
    let (writer, guard) = non_blocking(appender);

    let layer = formatter::build_formatter(config, file.format, writer, false);
    Ok((layer, guard))
}
