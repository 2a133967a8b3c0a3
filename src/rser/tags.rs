//! Теги значений и константы фрейминга формата RSER.
//!
//! Каждое значение на проводе начинается с однобайтового тега. Все
//! многобайтовые числа пишутся в big-endian.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use rser_error::VersionError;

/// Маркер потокового заголовка: ASCII «RSER».
pub const STREAM_MAGIC: &[u8; 4] = b"RSER";
/// Потоковый заголовок: маркер + байт версии.
pub const STREAM_HEADER_LEN: usize = STREAM_MAGIC.len() + 1;
/// Заголовок сообщения: длина payload (u32).
pub const MESSAGE_HEADER_LEN: usize = 4;

pub const TAG_NULL: u8 = 0x01;
pub const TAG_UNDEFINED: u8 = 0x02;
pub const TAG_BOOL: u8 = 0x03;
pub const TAG_INT8: u8 = 0x04;
pub const TAG_INT16: u8 = 0x05;
pub const TAG_INT32: u8 = 0x06;
pub const TAG_INT64: u8 = 0x07;
pub const TAG_BIGINT: u8 = 0x08;
pub const TAG_FLOAT: u8 = 0x09;
pub const TAG_STR: u8 = 0x0A;
pub const TAG_ARRAY: u8 = 0x0B;
pub const TAG_MAP: u8 = 0x0C;
pub const TAG_SET: u8 = 0x0D;
pub const TAG_OBJECT: u8 = 0x0E;
pub const TAG_DATE: u8 = 0x0F;
pub const TAG_REGEXP: u8 = 0x10;
pub const TAG_ERROR: u8 = 0x11;
pub const TAG_BYTES: u8 = 0x12;
pub const TAG_REFERENCE: u8 = 0x13;

/// Тег значения на проводе.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum Tag {
    Null = TAG_NULL,
    Undefined = TAG_UNDEFINED,
    Bool = TAG_BOOL,
    Int8 = TAG_INT8,
    Int16 = TAG_INT16,
    Int32 = TAG_INT32,
    Int64 = TAG_INT64,
    BigInt = TAG_BIGINT,
    Float = TAG_FLOAT,
    Str = TAG_STR,
    Array = TAG_ARRAY,
    Map = TAG_MAP,
    Set = TAG_SET,
    Object = TAG_OBJECT,
    Date = TAG_DATE,
    RegExp = TAG_REGEXP,
    Error = TAG_ERROR,
    Bytes = TAG_BYTES,
    Reference = TAG_REFERENCE,
}

impl Tag {
    /// Создаёт ли значение с этим тегом запись в таблице ссылок.
    pub fn is_referenceable(self) -> bool {
        matches!(
            self,
            Tag::Array
                | Tag::Map
                | Tag::Set
                | Tag::Object
                | Tag::Date
                | Tag::RegExp
                | Tag::Error
        )
    }
}

/// Поддерживаемые версии потокового формата.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    V1 = 1,
}

impl FormatVersion {
    pub const CURRENT: FormatVersion = FormatVersion::V1;

    /// Все версии, которые умеет читать эта сборка.
    pub fn supported() -> Vec<u8> {
        vec![FormatVersion::V1 as u8]
    }
}

impl TryFrom<u8> for FormatVersion {
    type Error = VersionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FormatVersion::V1),
            other => Err(VersionError::UnsupportedVersion {
                found: other,
                supported: FormatVersion::supported(),
            }),
        }
    }
}

/// Текущая версия потока как байт заголовка.
pub const STREAM_VERSION: u8 = FormatVersion::CURRENT as u8;

/// Потоковый заголовок текущей версии.
pub fn stream_header() -> [u8; STREAM_HEADER_LEN] {
    let mut header = [0u8; STREAM_HEADER_LEN];
    header[..STREAM_MAGIC.len()].copy_from_slice(STREAM_MAGIC);
    header[STREAM_MAGIC.len()] = STREAM_VERSION;
    header
}
