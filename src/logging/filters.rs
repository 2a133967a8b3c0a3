use tracing_subscriber::EnvFilter;

use crate::logging::config::LoggingConfig;

/// Фильтр уровней: `RUST_LOG`, если задана, иначе директива из конфига.
pub fn build_filter_from_config(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.build_filter_directive()))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
