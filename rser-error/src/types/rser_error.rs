use std::any::Any;

use crate::{ErrorExt, StatusCode, VersionError};

/// Основная ошибка кодека RSER с контекстом для диагностики.
///
/// Смещения (`offset`) считаются от начала payload текущего сообщения для
/// ошибок парсера и от начала потока для ошибок фрейминга.
#[derive(Debug, Clone)]
pub enum RserError {
    /// Проходы кодировщика разошлись: буфер переполнен, недозаполнен или
    /// таблица ссылок не совпала. Баг в библиотеке, не ошибка данных.
    InvariantViolation {
        reason: String,
        offset: Option<u64>,
    },

    /// Значение нельзя представить в формате (например, длина не влезает в
    /// u32). Возникает до того, как записан хотя бы один байт.
    UnsupportedValue { what: String, reason: String },

    /// Неизвестный тег значения
    InvalidTag { tag: u8, offset: Option<u64> },

    /// Данные закончились раньше, чем требовалось
    UnexpectedEof {
        context: String,
        offset: Option<u64>,
        expected_bytes: Option<u64>,
        got_bytes: Option<u64>,
    },

    /// Превышен лимит размера
    SizeLimit {
        what: String,
        size: u64,
        limit: u64,
        offset: Option<u64>,
    },

    /// Неверный маркер потокового заголовка
    InvalidMagic { expected: [u8; 4], got: [u8; 4] },

    /// Ссылка на объект, который ещё не был декодирован
    InvalidReference {
        id: u32,
        known: u32,
        offset: Option<u64>,
    },

    /// Строка не является корректным UTF-8
    InvalidUtf8 { what: String, offset: Option<u64> },

    /// Превышена глубина вложенности
    DepthLimit {
        depth: usize,
        limit: usize,
        offset: Option<u64>,
    },

    /// После корневого значения в payload остались байты
    TrailingBytes { remaining: u64, offset: Option<u64> },

    /// Поток закончился посреди сообщения
    TruncatedStream { buffered: u64, state: String },

    /// Ошибка разбора структуры
    ParseError {
        structure: String,
        reason: String,
        offset: Option<u64>,
    },

    /// Версионные ошибки (делегирование в VersionError)
    Version(VersionError),
}

impl RserError {
    /// Добавляет контекст offset к ошибке.
    pub fn with_offset(
        mut self,
        offset: u64,
    ) -> Self {
        match &mut self {
            Self::InvariantViolation { offset: o, .. }
            | Self::InvalidTag { offset: o, .. }
            | Self::UnexpectedEof { offset: o, .. }
            | Self::SizeLimit { offset: o, .. }
            | Self::InvalidReference { offset: o, .. }
            | Self::InvalidUtf8 { offset: o, .. }
            | Self::DepthLimit { offset: o, .. }
            | Self::TrailingBytes { offset: o, .. }
            | Self::ParseError { offset: o, .. } => {
                *o = Some(offset);
            }
            _ => {}
        }
        self
    }

    /// Возвращает подсказку по восстановлению.
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvariantViolation { .. } => {
                Some("Encoder passes disagree; report this as a bug with the input value")
            }
            Self::Version(_) => Some("Discard the stream and recompute the value"),
            Self::TruncatedStream { .. } | Self::UnexpectedEof { .. } => {
                Some("Stream may be truncated. Check the producer and file integrity")
            }
            Self::SizeLimit { .. } => Some("Increase max_message_size in the settings"),
            _ => None,
        }
    }

    /// Ошибка повреждённого или некорректного потока.
    ///
    /// Такой поток нельзя читать дальше, а кеш должен считать результат
    /// промахом.
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            Self::InvariantViolation { .. } | Self::UnsupportedValue { .. } | Self::Version(_)
        )
    }

    /// Фатальное нарушение инварианта кодировщика.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

impl std::fmt::Display for RserError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::InvariantViolation { reason, offset } => {
                write!(f, "Invariant violation: {reason}")?;
                write_offset(f, *offset)
            }
            Self::UnsupportedValue { what, reason } => {
                write!(f, "Unsupported value ({what}): {reason}")
            }
            Self::InvalidTag { tag, offset } => {
                write!(f, "Invalid tag 0x{tag:02X}")?;
                write_offset(f, *offset)
            }
            Self::UnexpectedEof {
                context,
                offset,
                expected_bytes,
                got_bytes,
            } => {
                write!(f, "Unexpected EOF: {context}")?;
                if let (Some(exp), Some(got)) = (expected_bytes, got_bytes) {
                    write!(f, " (expected {exp} bytes, got {got})")?;
                }
                write_offset(f, *offset)
            }
            Self::SizeLimit {
                what,
                size,
                limit,
                offset,
            } => {
                write!(f, "{what} size {size} exceeds limit {limit}")?;
                write_offset(f, *offset)
            }
            Self::InvalidMagic { expected, got } => {
                write!(
                    f,
                    "Invalid stream marker: expected {expected:?}, got {got:?}",
                )
            }
            Self::InvalidReference { id, known, offset } => {
                write!(f, "Reference #{id} points past the {known} decoded objects")?;
                write_offset(f, *offset)
            }
            Self::InvalidUtf8 { what, offset } => {
                write!(f, "Invalid UTF-8 in {what}")?;
                write_offset(f, *offset)
            }
            Self::DepthLimit {
                depth,
                limit,
                offset,
            } => {
                write!(f, "Nesting depth {depth} exceeds limit {limit}")?;
                write_offset(f, *offset)
            }
            Self::TrailingBytes { remaining, offset } => {
                write!(f, "{remaining} trailing bytes after the root value")?;
                write_offset(f, *offset)
            }
            Self::TruncatedStream { buffered, state } => {
                write!(
                    f,
                    "Stream ended in state {state} with {buffered} unconsumed bytes"
                )
            }
            Self::ParseError {
                structure,
                reason,
                offset,
            } => {
                write!(f, "Failed to parse {structure}: {reason}")?;
                write_offset(f, *offset)
            }
            Self::Version(v) => write!(f, "{v}"),
        }
    }
}

fn write_offset(
    f: &mut std::fmt::Formatter<'_>,
    offset: Option<u64>,
) -> std::fmt::Result {
    if let Some(o) = offset {
        write!(f, " [offset: 0x{o:X}]")?;
    }
    Ok(())
}

impl std::error::Error for RserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Version(v) => Some(v),
            _ => None,
        }
    }
}

impl ErrorExt for RserError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvariantViolation { .. } => StatusCode::InvariantViolation,
            Self::UnsupportedValue { .. } => StatusCode::UnsupportedValue,
            Self::InvalidTag { .. } => StatusCode::InvalidTag,
            Self::UnexpectedEof { .. } => StatusCode::UnexpectedEof,
            Self::SizeLimit { .. } => StatusCode::SizeLimit,
            Self::InvalidMagic { .. } => StatusCode::InvalidFrame,
            Self::InvalidReference { .. } => StatusCode::InvalidReference,
            Self::InvalidUtf8 { .. } => StatusCode::InvalidUtf8,
            Self::DepthLimit { .. } => StatusCode::DepthLimit,
            Self::TrailingBytes { .. } => StatusCode::InvalidFrame,
            Self::TruncatedStream { .. } => StatusCode::TruncatedStream,
            Self::ParseError { .. } => StatusCode::ParseError,
            Self::Version(v) => v.status_code(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn log_message(&self) -> String {
        let mut msg = format!("{self:?}");
        if let Some(hint) = self.recovery_hint() {
            msg.push_str(&format!(" | Hint: {hint}"));
        }
        msg
    }
}

impl From<VersionError> for RserError {
    fn from(e: VersionError) -> Self {
        RserError::Version(e)
    }
}

impl From<RserError> for std::io::Error {
    fn from(e: RserError) -> Self {
        let kind = match &e {
            RserError::UnexpectedEof { .. } | RserError::TruncatedStream { .. } => {
                std::io::ErrorKind::UnexpectedEof
            }
            RserError::Version(_) => std::io::ErrorKind::Unsupported,
            RserError::UnsupportedValue { .. } | RserError::SizeLimit { .. } => {
                std::io::ErrorKind::InvalidInput
            }
            RserError::InvariantViolation { .. } => std::io::ErrorKind::Other,
            _ => std::io::ErrorKind::InvalidData,
        };

        std::io::Error::new(kind, e.to_string())
    }
}
