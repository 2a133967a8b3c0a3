use std::fmt;

use num_enum::TryFromPrimitive;

/// Категория ошибки RSER в виде числового кода.
///
/// Старшая цифра задаёт группу:
/// - 1xxx: ошибки библиотеки и входных значений кодировщика;
/// - 2xxx: ввод-вывод;
/// - 3xxx: содержимое потока (фрейминг, теги, ссылки, версии).
///
/// Коды стабильны: их можно сохранять в метриках и сравнивать между
/// сборками, поэтому новые варианты только добавляются в конец группы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    Internal = 1000,
    InvalidArgs = 1001,
    /// Проходы кодировщика разошлись.
    InvariantViolation = 1002,
    /// Значение не представимо в формате.
    UnsupportedValue = 1003,

    Io = 2000,
    NotFound = 2001,
    UnexpectedEof = 2002,

    InvalidFrame = 3000,
    UnsupportedVersion = 3001,
    InvalidTag = 3002,
    InvalidReference = 3003,
    InvalidUtf8 = 3004,
    SizeLimit = 3005,
    DepthLimit = 3006,
    ParseError = 3007,
    TruncatedStream = 3008,
}

/// Уровень, с которым ошибку стоит отправить в лог.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl StatusCode {
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Обратное преобразование из числового кода.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Ошибка в содержимом потока (группа 3xxx).
    pub fn is_stream_error(self) -> bool {
        self.code() / 1000 == 3
    }

    /// Прочитанные данные непригодны, но значение можно пересчитать: кеш
    /// трактует такой результат как промах.
    pub fn is_cache_miss(self) -> bool {
        self.is_stream_error() || self == Self::UnexpectedEof
    }

    /// Баг в библиотеке, а не в данных.
    pub fn is_critical(self) -> bool {
        matches!(self, Self::Internal | Self::InvariantViolation)
    }

    pub fn log_level(self) -> LogLevel {
        match self {
            Self::Internal | Self::InvariantViolation => LogLevel::Error,
            Self::NotFound => LogLevel::Debug,
            Self::InvalidArgs | Self::UnsupportedValue | Self::UnsupportedVersion => LogLevel::Info,
            _ => LogLevel::Warn,
        }
    }
}

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{self:?} ({})", self.code())
    }
}
