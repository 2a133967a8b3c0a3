//! Логирование на `tracing`.
//!
//! Кодек пишет события через макросы `tracing` и ничего не настраивает сам.
//! [`init_logging`] нужен приложениям и тестам, которым нужен готовый
//! subscriber: `EnvFilter`, консольный слой и, по желанию, файловый.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use rser_error::{LogLevel, RserResult, StackError, StatusCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобальный subscriber по конфигурации.
///
/// Ошибка, если конфигурация некорректна или subscriber уже установлен.
pub fn init_logging(mut config: LoggingConfig) -> RserResult<LoggingHandle> {
    config.apply_env_overrides();
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers = Vec::new();

    if config.console.enabled {
        layers.push(sinks::console::layer_with_config(&config));
    }

    let file_guard = if config.file.enabled {
        let (file_layer, guard) = sinks::file::layer_with_config(&config);
        layers.push(file_layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| {
            StackError::new(rser_error::GenericError::new(
                StatusCode::Internal,
                format!("failed to install tracing subscriber: {e}"),
            ))
        })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        console = config.console.enabled,
        file = config.file.enabled,
        "Logging system initialized"
    );

    let file_dir = config.file.enabled.then(|| config.file.dir.clone());
    Ok(LoggingHandle::new(file_guard, file_dir))
}

/// Пишет ошибку в лог с уровнем, который задаёт её код.
pub fn log_error(
    err: &StackError,
    what: &str,
) {
    let code = err.status_code();
    let details = err.log_message();
    match err.log_level() {
        LogLevel::Error => tracing::error!(%code, %details, "{what}"),
        LogLevel::Warn => tracing::warn!(%code, %details, "{what}"),
        LogLevel::Info => tracing::info!(%code, %details, "{what}"),
        LogLevel::Debug => tracing::debug!(%code, %details, "{what}"),
    }
}
