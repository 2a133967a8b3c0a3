pub mod rser_error;
pub mod version;

use std::{any::Any, fmt, io};

pub use rser_error::*;
pub use version::*;

use crate::{ErrorExt, StackError, StatusCode};

/// Ошибка без собственного типа: код и текст.
///
/// Используется для ввода-вывода и ошибок настройки, где отдельный enum
/// ничего не добавляет.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericError {
    code: StatusCode,
    message: String,
}

impl GenericError {
    pub fn new(
        code: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for GenericError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GenericError {}

impl ErrorExt for GenericError {
    fn status_code(&self) -> StatusCode {
        self.code
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Код статуса для ошибки ввода-вывода. Обрыв чтения отделён от прочих
/// сбоев: для кеша это промах, а не отказ диска.
fn io_status(kind: io::ErrorKind) -> StatusCode {
    match kind {
        io::ErrorKind::NotFound => StatusCode::NotFound,
        io::ErrorKind::UnexpectedEof => StatusCode::UnexpectedEof,
        _ => StatusCode::Io,
    }
}

impl From<io::Error> for StackError {
    fn from(err: io::Error) -> Self {
        StackError::new(GenericError::new(io_status(err.kind()), err.to_string()))
    }
}
