use std::{fmt, panic::Location, sync::Arc};

use crate::{ErrorExt, LogLevel, StatusCode};

/// Ошибка с цепочкой контекстов.
///
/// Корневая ошибка (обычно [`RserError`](crate::RserError)) лежит за `Arc`,
/// так что клонирование дёшево. По мере подъёма по стеку вызовов к ней
/// приклеиваются контексты: номер сообщения, путь к файлу и т.п. Каждый
/// контекст помнит место вызова.
#[derive(Clone)]
pub struct StackError {
    root: Arc<dyn ErrorExt>,
    contexts: Vec<ErrorContext>,
}

/// Один уровень контекста.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub message: String,
    pub location: &'static Location<'static>,
}

impl fmt::Display for ErrorContext {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{} (at {}:{})",
            self.message,
            self.location.file(),
            self.location.line()
        )
    }
}

impl StackError {
    pub fn new<E: ErrorExt>(err: E) -> Self {
        Self {
            root: Arc::new(err),
            contexts: Vec::new(),
        }
    }

    /// Приклеивает контекст. Контексты хранятся в порядке добавления: от
    /// ближайшего к корню до самого внешнего.
    #[track_caller]
    pub fn context(
        mut self,
        msg: impl Into<String>,
    ) -> Self {
        self.contexts.push(ErrorContext {
            message: msg.into(),
            location: Location::caller(),
        });
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.root.status_code()
    }

    pub fn root(&self) -> &dyn ErrorExt {
        self.root.as_ref()
    }

    pub fn contexts(&self) -> &[ErrorContext] {
        &self.contexts
    }

    pub fn downcast_ref<T: ErrorExt>(&self) -> Option<&T> {
        self.root.as_any().downcast_ref::<T>()
    }

    pub fn log_level(&self) -> LogLevel {
        self.status_code().log_level()
    }

    /// Развёрнутое сообщение для лога: корень со всеми подробностями и
    /// места, где приклеивались контексты.
    pub fn log_message(&self) -> String {
        let mut msg = self.root.log_message();
        for ctx in self.contexts.iter().rev() {
            msg.push_str("\n  while ");
            msg.push_str(&ctx.to_string());
        }
        msg
    }

    pub fn is_critical(&self) -> bool {
        self.status_code().is_critical()
    }

    /// Кеш должен считать результат промахом и пересчитать значение.
    pub fn is_cache_miss(&self) -> bool {
        self.status_code().is_cache_miss()
    }
}

impl fmt::Debug for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("StackError")
            .field("code", &self.status_code())
            .field("root", &self.root.to_string())
            .field("contexts", &self.contexts)
            .finish()
    }
}

/// Внешний контекст первым: `reading a.rser: decoding message #0: Invalid tag`.
impl fmt::Display for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for ctx in self.contexts.iter().rev() {
            write!(f, "{}: ", ctx.message)?;
        }
        write!(f, "{}", self.root)
    }
}

impl std::error::Error for StackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.root.as_ref())
    }
}

impl<E: ErrorExt> From<E> for StackError {
    fn from(e: E) -> Self {
        StackError::new(e)
    }
}

impl From<StackError> for std::io::Error {
    fn from(e: StackError) -> Self {
        let kind = match e.status_code() {
            StatusCode::NotFound => std::io::ErrorKind::NotFound,
            StatusCode::UnexpectedEof | StatusCode::TruncatedStream => {
                std::io::ErrorKind::UnexpectedEof
            }
            code if code.is_stream_error() => std::io::ErrorKind::InvalidData,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RserError;

    fn bad_tag() -> StackError {
        StackError::new(RserError::InvalidTag {
            tag: 0xEE,
            offset: Some(4),
        })
    }

    /// Тест проверяет порядок контекстов и запись места вызова.
    #[test]
    fn test_context_chain() {
        let err = bad_tag()
            .context("decoding message #3")
            .context("reading cache.rser");

        assert_eq!(err.contexts().len(), 2);
        assert_eq!(err.contexts()[0].message, "decoding message #3");
        assert!(err.contexts()[0].location.file().ends_with("stack.rs"));
        assert_eq!(
            err.to_string(),
            "reading cache.rser: decoding message #3: Invalid tag 0xEE [offset: 0x4]"
        );
    }

    #[test]
    fn test_downcast() {
        let err = bad_tag();
        let root = err.downcast_ref::<RserError>().unwrap();
        assert!(matches!(root, RserError::InvalidTag { tag: 0xEE, .. }));
    }

    /// Тест проверяет, что log_message несёт подсказку корня и контексты.
    #[test]
    fn test_log_message() {
        let err = StackError::new(RserError::SizeLimit {
            what: "message".to_string(),
            size: 10,
            limit: 5,
            offset: None,
        })
        .context("decoding message #0");

        let msg = err.log_message();
        assert!(msg.contains("max_message_size"), "got: {msg}");
        assert!(msg.contains("while decoding message #0"), "got: {msg}");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_cache_miss_and_critical() {
        assert!(bad_tag().is_cache_miss());
        assert!(!bad_tag().is_critical());

        let fatal = StackError::new(RserError::InvariantViolation {
            reason: "overflow".to_string(),
            offset: Some(0),
        });
        assert!(fatal.is_critical());
        assert!(!fatal.is_cache_miss());
    }

    #[test]
    fn test_into_io_error() {
        let io: std::io::Error = bad_tag().into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidData);
    }
}
