use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;

/// Handle жизненного цикла логирования.
///
/// Держит guard файлового слоя: пока handle жив, фоновый поток пишет логи;
/// при drop буфер сбрасывается на диск.
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
    file_dir: Option<PathBuf>,
}

impl LoggingHandle {
    pub fn new(
        file_guard: Option<WorkerGuard>,
        file_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            file_guard,
            file_dir,
        }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Каталог файловых логов, если файловый слой включён.
    pub fn file_dir(&self) -> Option<&PathBuf> {
        self.file_dir.as_ref()
    }

    /// Сбрасывает буферы и завершает фоновую запись.
    pub fn shutdown(self) {
        tracing::debug!("Logging shutdown");
        drop(self);
    }
}
