use std::time::{Duration, Instant};

use tracing_appender::non_blocking::WorkerGuard;

/// Порог, после которого долгий сброс буфера считается подозрительным.
const FLUSH_WARN_THRESHOLD: Duration = Duration::from_secs(5);

/// Handle для управления lifecycle логирования.
///
/// Держит `WorkerGuard` файлового sink'а: пока handle жив, фоновый поток
/// записи работает; `shutdown` сбрасывает буфер.
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Graceful shutdown: сбрасывает файловый буфер.
    pub fn shutdown(mut self) {
        tracing::info!(file_sink = self.has_file_sink(), "Initiating logging shutdown");

        let start = Instant::now();
        drop(self.file_guard.take());
        let elapsed = start.elapsed();

        if elapsed > FLUSH_WARN_THRESHOLD {
            eprintln!(
                "WARNING: Logging shutdown took {}ms (threshold: {}ms)",
                elapsed.as_millis(),
                FLUSH_WARN_THRESHOLD.as_millis()
            );
        }
    }
}

impl std::fmt::Debug for LoggingHandle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LoggingHandle")
            .field("file_sink", &self.has_file_sink())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет handle без файлового sink'а.
    #[test]
    fn test_console_only_handle() {
        let handle = LoggingHandle::new(None);
        assert!(!handle.has_file_sink());
        assert_eq!(
            format!("{handle:?}"),
            "LoggingHandle { file_sink: false }"
        );
        handle.shutdown();
    }

    /// Тест проверяет, что `shutdown` сбрасывает буфер файлового writer'а.
    #[test]
    fn test_shutdown_flushes_file_guard() {
        let dir = tempfile::tempdir().unwrap();
        let appender = tracing_appender::rolling::never(dir.path(), "handle.log");
        let (mut writer, guard) = tracing_appender::non_blocking(appender);

        let handle = LoggingHandle::new(Some(guard));
        assert!(handle.has_file_sink());
        std::io::Write::write_all(&mut writer, b"flushed line\n").unwrap();
        handle.shutdown();

        let written = std::fs::read_to_string(dir.path().join("handle.log")).unwrap();
        assert!(written.contains("flushed line"), "got: {written}");
    }
}
