use std::{any::Any, error::Error};

use crate::StatusCode;

/// Общий интерфейс корневых ошибок, которые может нести [`StackError`].
///
/// Трейт object-safe: `StackError` хранит корень как `Arc<dyn ErrorExt>`.
///
/// [`StackError`]: crate::StackError
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Без переопределения ошибка считается внутренней.
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Нужен для `StackError::downcast_ref`.
    fn as_any(&self) -> &dyn Any;

    /// Сообщение для лога. По умолчанию `Debug`, чтобы попали все поля.
    fn log_message(&self) -> String {
        format!("{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct Bare;

    impl fmt::Display for Bare {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            f.write_str("bare")
        }
    }

    impl Error for Bare {}

    impl ErrorExt for Bare {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Bare.status_code(), StatusCode::Internal);
        assert_eq!(Bare.log_message(), "Bare");
        assert!(Bare.as_any().downcast_ref::<Bare>().is_some());
    }
}
