//! Общий обход значения поверх абстрактного приёмника.
//!
//! [`write_value`] написан один раз и инстанцируется для трёх приёмников:
//! [`CountingSink`](super::CountingSink) считает размер и строит таблицу
//! ссылок, [`BufferSink`](super::BufferSink) пишет байты в заранее
//! выделенный буфер, [`HashSink`](super::HashSink) кормит SHA-256.

use byteorder::{BigEndian, ByteOrder};
use rser_error::{RserError, RserResult};

use super::tags::*;
use crate::value::{Value, MAX_SAFE_INTEGER, MIN_SAFE_INTEGER};

/// Глубина вложенности, которую принимает декодер по умолчанию. Кодировщик
/// не производит значения глубже.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Ширина целого на проводе.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    /// Наименьшая ширина, в которую помещается `v`.
    pub fn for_value(v: i64) -> Self {
        if i8::try_from(v).is_ok() {
            IntWidth::I8
        } else if i16::try_from(v).is_ok() {
            IntWidth::I16
        } else if i32::try_from(v).is_ok() {
            IntWidth::I32
        } else {
            IntWidth::I64
        }
    }

    pub fn size(self) -> usize {
        match self {
            IntWidth::I8 => 1,
            IntWidth::I16 => 2,
            IntWidth::I32 => 4,
            IntWidth::I64 => 8,
        }
    }

    pub fn tag(self) -> Tag {
        match self {
            IntWidth::I8 => Tag::Int8,
            IntWidth::I16 => Tag::Int16,
            IntWidth::I32 => Tag::Int32,
            IntWidth::I64 => Tag::Int64,
        }
    }

    pub fn from_tag(tag: Tag) -> Option<Self> {
        match tag {
            Tag::Int8 => Some(IntWidth::I8),
            Tag::Int16 => Some(IntWidth::I16),
            Tag::Int32 => Some(IntWidth::I32),
            Tag::Int64 => Some(IntWidth::I64),
            _ => None,
        }
    }
}

/// Приёмник типизированных примитивов.
///
/// Обязательны только [`write_raw`](Sink::write_raw) и два метода таблицы
/// ссылок; остальные записи выражены через `write_raw` в big-endian.
pub trait Sink {
    /// Записывает сырые байты.
    fn write_raw(
        &mut self,
        bytes: &[u8],
    ) -> RserResult<()>;

    /// Id объекта, если он уже был записан этим проходом.
    fn lookup_reference(
        &self,
        identity: usize,
    ) -> Option<u32>;

    /// Регистрирует объект перед записью его тела.
    fn on_reference_create(
        &mut self,
        identity: usize,
    ) -> RserResult<()>;

    fn write_u8(
        &mut self,
        v: u8,
    ) -> RserResult<()> {
        self.write_raw(&[v])
    }

    fn write_u32(
        &mut self,
        v: u32,
    ) -> RserResult<()> {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, v);
        self.write_raw(&buf)
    }

    /// Пишет целое заданной ширины. Значение обязано в неё помещаться.
    fn write_int(
        &mut self,
        v: i64,
        width: IntWidth,
    ) -> RserResult<()> {
        let mut buf = [0u8; 8];
        let n = width.size();
        match width {
            IntWidth::I8 => buf[0] = v as i8 as u8,
            IntWidth::I16 => BigEndian::write_i16(&mut buf, v as i16),
            IntWidth::I32 => BigEndian::write_i32(&mut buf, v as i32),
            IntWidth::I64 => BigEndian::write_i64(&mut buf, v),
        }
        self.write_raw(&buf[..n])
    }

    fn write_float(
        &mut self,
        v: f64,
    ) -> RserResult<()> {
        let mut buf = [0u8; 8];
        BigEndian::write_f64(&mut buf, v);
        self.write_raw(&buf)
    }

    /// Длина или количество элементов; должно помещаться в u32.
    fn write_len(
        &mut self,
        len: usize,
        what: &'static str,
    ) -> RserResult<()> {
        let len = wire_len(len, what)?;
        self.write_u32(len)
    }

    /// Строка: u32 длина в байтах + UTF-8.
    fn write_str(
        &mut self,
        s: &str,
    ) -> RserResult<()> {
        self.write_len(s.len(), "string")?;
        self.write_raw(s.as_bytes())
    }

    /// Блоб: u32 длина + байты.
    fn write_bytes(
        &mut self,
        b: &[u8],
    ) -> RserResult<()> {
        self.write_len(b.len(), "bytes")?;
        self.write_raw(b)
    }
}

/// Проверяет, что длина помещается в поле u32.
pub fn wire_len(
    len: usize,
    what: &'static str,
) -> RserResult<u32> {
    u32::try_from(len).map_err(|_| {
        RserError::UnsupportedValue {
            what: what.to_string(),
            reason: format!("length {len} does not fit into u32"),
        }
        .into()
    })
}

/// Записывает значение в приёмник, начиная с корня.
pub fn write_value<S: Sink + ?Sized>(
    sink: &mut S,
    value: &Value,
) -> RserResult<()> {
    write_at(sink, value, 0)
}

fn write_at<S: Sink + ?Sized>(
    sink: &mut S,
    value: &Value,
    depth: usize,
) -> RserResult<()> {
    if depth > DEFAULT_MAX_DEPTH {
        return Err(RserError::UnsupportedValue {
            what: value.kind().to_string(),
            reason: format!("nesting depth exceeds {DEFAULT_MAX_DEPTH}"),
        }
        .into());
    }

    if let Some(identity) = value.identity() {
        if let Some(id) = sink.lookup_reference(identity) {
            sink.write_u8(TAG_REFERENCE)?;
            return sink.write_u32(id);
        }
        sink.on_reference_create(identity)?;
    }

    match value {
        Value::Null => sink.write_u8(TAG_NULL),
        Value::Undefined => sink.write_u8(TAG_UNDEFINED),
        Value::Bool(b) => {
            sink.write_u8(TAG_BOOL)?;
            sink.write_u8(u8::from(*b))
        }
        Value::Int(i) => {
            if (MIN_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(i) {
                let width = IntWidth::for_value(*i);
                sink.write_u8(width.tag().into())?;
                sink.write_int(*i, width)
            } else {
                write_bigint(sink, *i as i128)
            }
        }
        Value::BigInt(i) => write_bigint(sink, *i),
        Value::Float(f) => {
            sink.write_u8(TAG_FLOAT)?;
            sink.write_float(*f)
        }
        Value::Str(s) => {
            sink.write_u8(TAG_STR)?;
            sink.write_str(s)
        }
        Value::Bytes(b) => {
            sink.write_u8(TAG_BYTES)?;
            sink.write_bytes(b)
        }
        Value::Array(items) | Value::Set(items) => {
            let tag = if matches!(value, Value::Array(_)) {
                TAG_ARRAY
            } else {
                TAG_SET
            };
            let items = items.borrow();
            sink.write_u8(tag)?;
            sink.write_len(items.len(), value.kind())?;
            for item in items.iter() {
                write_at(sink, item, depth + 1)?;
            }
            Ok(())
        }
        Value::Map(entries) => {
            let entries = entries.borrow();
            sink.write_u8(TAG_MAP)?;
            sink.write_len(entries.len(), "map")?;
            for (k, v) in entries.iter() {
                write_at(sink, k, depth + 1)?;
                write_at(sink, v, depth + 1)?;
            }
            Ok(())
        }
        Value::Object(entries) => {
            let entries = entries.borrow();
            sink.write_u8(TAG_OBJECT)?;
            sink.write_len(entries.len(), "object")?;
            for (k, v) in entries.iter() {
                sink.write_str(k)?;
                write_at(sink, v, depth + 1)?;
            }
            Ok(())
        }
        Value::Date(d) => {
            sink.write_u8(TAG_DATE)?;
            sink.write_float(d.millis)
        }
        Value::RegExp(r) => {
            sink.write_u8(TAG_REGEXP)?;
            sink.write_str(&r.source)?;
            sink.write_str(&r.flags)
        }
        Value::Error(e) => {
            sink.write_u8(TAG_ERROR)?;
            sink.write_str(&e.name)?;
            sink.write_str(&e.message)?;
            match &e.stack {
                Some(stack) => {
                    sink.write_u8(1)?;
                    sink.write_str(stack)
                }
                None => sink.write_u8(0),
            }
        }
    }
}

fn write_bigint<S: Sink + ?Sized>(
    sink: &mut S,
    v: i128,
) -> RserResult<()> {
    sink.write_u8(TAG_BIGINT)?;
    sink.write_str(&v.to_string())
}
