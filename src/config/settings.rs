use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::rser::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_MESSAGE_SIZE};

/// Размер куска при чтении файла по умолчанию (64 KiB).
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

/// Настройки декодера и файлового чтения.
///
/// Загружаются из значений по умолчанию и переменных окружения с префиксом
/// `RSER_` (например, `RSER_MAX_MESSAGE_SIZE=1048576`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RserSettings {
    /// Максимальная длина payload одного сообщения.
    pub max_message_size: usize,
    /// Максимальная глубина вложенности при разборе.
    pub max_depth: usize,
    /// Размер куска, которым `decode_file_stream` читает файл.
    pub read_chunk_size: usize,
}

impl Default for RserSettings {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

impl RserSettings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Environment::with_prefix("RSER").try_parsing(true))
    }

    /// Загрузка с явным источником окружения (для тестов).
    pub fn load_from(env: Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cfg = Config::builder()
            .set_default("max_message_size", defaults.max_message_size as u64)?
            .set_default("max_depth", defaults.max_depth as u64)?
            .set_default("read_chunk_size", defaults.read_chunk_size as u64)?
            .add_source(env)
            .build()?;

        let settings: Self = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.read_chunk_size == 0 {
            return Err(ConfigError::Message(
                "read_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Message(
                "max_depth must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
