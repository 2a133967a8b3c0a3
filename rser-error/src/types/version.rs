use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки версии потокового заголовка RSER.
///
/// Маркер распознан, но версия неизвестна: поток не повреждён, он просто
/// записан другой сборкой. Потоковый декодер превращает эту ошибку в исход
/// `Incompatible`, а не в сбой.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Unsupported RSER stream version {found} (supported: {supported:?})")]
    UnsupportedVersion { found: u8, supported: Vec<u8> },
}

impl VersionError {
    /// Версия, найденная в заголовке.
    pub fn found(&self) -> u8 {
        match self {
            Self::UnsupportedVersion { found, .. } => *found,
        }
    }
}

impl ErrorExt for VersionError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UnsupportedVersion
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
