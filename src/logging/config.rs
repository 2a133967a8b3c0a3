use std::{path::PathBuf, str::FromStr};

use rser_error::{bail, ensure, RserResult, StatusCode};
use serde::{Deserialize, Serialize};

/// Формат консольного вывода.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Настройки консольного слоя.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_true")]
    pub with_ansi: bool,
    #[serde(default = "default_true")]
    pub with_target: bool,
    #[serde(default)]
    pub with_thread_ids: bool,
    #[serde(default)]
    pub with_line_numbers: bool,
}

/// Настройки файлового слоя (ежедневная ротация).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_log_filename")]
    pub filename: String,
}

/// Конфигурация логирования.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Уровень или полная директива `EnvFilter` (`info`, `rser=trace`).
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub file: FileConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_log_dir(),
            filename: default_log_filename(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

impl LoggingConfig {
    /// Переопределения из `RSER_LOG_LEVEL`, `RSER_LOG_FORMAT`, `RSER_LOG_DIR`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Применяет переопределения из произвольного источника ключ → значение.
    pub fn apply_overrides_from<F>(
        &mut self,
        lookup: F,
    ) where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("RSER_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(format) = lookup("RSER_LOG_FORMAT").and_then(|f| f.parse().ok()) {
            self.console.format = format;
        }
        if let Some(dir) = lookup("RSER_LOG_DIR") {
            self.file.dir = PathBuf::from(dir);
            self.file.enabled = true;
        }
    }

    pub fn validate(&self) -> RserResult<()> {
        if tracing_subscriber::EnvFilter::try_new(self.build_filter_directive()).is_err() {
            bail!(
                StatusCode::InvalidArgs,
                "invalid log filter directive '{}'",
                self.level
            );
        }
        ensure!(
            !self.file.enabled || !self.file.filename.trim().is_empty(),
            StatusCode::InvalidArgs,
            "log file name is empty"
        );
        Ok(())
    }

    pub fn build_filter_directive(&self) -> String {
        self.level.trim().to_string()
    }

    pub fn ensure_log_dir(&self) -> RserResult<()> {
        if self.file.enabled {
            std::fs::create_dir_all(&self.file.dir)?;
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_filename() -> String {
    "rser.log".to_string()
}
