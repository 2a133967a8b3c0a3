use crate::StackError;

/// Возвращает из функции `Err(StackError)`.
///
/// `bail!(err)` принимает любую ошибку, реализующую `ErrorExt`.
/// `bail!(code, "fmt", args..)` собирает [`GenericError`](crate::GenericError)
/// с кодом и отформатированным сообщением.
///
/// ```ignore
/// use rser_error::{bail, RserResult, StatusCode};
///
/// fn chunk_size(n: usize) -> RserResult<usize> {
///     if n == 0 {
///         bail!(StatusCode::InvalidArgs, "chunk size must be positive");
///     }
///     Ok(n)
/// }
/// ```
#[macro_export]
macro_rules! bail {
    ($err:expr $(,)?) => {
        return Err($crate::StackError::from($err))
    };
    ($code:expr, $($fmt:tt)+) => {
        return Err($crate::StackError::new(
            $crate::GenericError::new($code, format!($($fmt)+))
        ))
    };
}

/// `bail!`, если условие ложно. Аргументы после условия те же, что у `bail!`.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($rest:tt)+) => {
        if !($cond) {
            $crate::bail!($($rest)+);
        }
    };
}

/// Контекст для `Result`: ошибка превращается в [`StackError`] и получает
/// ещё один уровень описания.
pub trait ResultExt<T> {
    fn context(
        self,
        ctx: impl Into<String>,
    ) -> Result<T, StackError>;

    /// Контекст вычисляется только при ошибке.
    fn with_context<C: Into<String>>(
        self,
        f: impl FnOnce() -> C,
    ) -> Result<T, StackError>;
}

impl<T, E: Into<StackError>> ResultExt<T> for Result<T, E> {
    #[track_caller]
    fn context(
        self,
        ctx: impl Into<String>,
    ) -> Result<T, StackError> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().context(ctx)),
        }
    }

    #[track_caller]
    fn with_context<C: Into<String>>(
        self,
        f: impl FnOnce() -> C,
    ) -> Result<T, StackError> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().context(f())),
        }
    }
}
