//! Последовательный разбор payload одного сообщения.

use std::{cell::RefCell, rc::Rc};

use byteorder::{BigEndian, ByteOrder};
use rser_error::{RserError, RserResult};

use super::{
    sink::{IntWidth, DEFAULT_MAX_DEPTH},
    tags::Tag,
};
use crate::value::{DateValue, ErrorValue, RegExpValue, Value};

/// Читатель payload с курсором и таблицей ссылок id → значение.
///
/// Контейнер регистрируется в таблице до чтения своих детей, поэтому
/// обратные ссылки (в том числе на самого себя) указывают на ту же
/// аллокацию. Смещения в ошибках считаются от начала `data`.
pub struct BufferParser<'a> {
    data: &'a [u8],
    pos: usize,
    refs: Vec<Value>,
    max_depth: usize,
}

impl<'a> BufferParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            refs: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(
        mut self,
        max_depth: usize,
    ) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Разбирает payload целиком: одно корневое значение и ни байта после.
    pub fn parse(
        data: &'a [u8],
        max_depth: usize,
    ) -> RserResult<Value> {
        let mut parser = Self::new(data).with_max_depth(max_depth);
        let value = parser.read_value()?;
        parser.expect_end()?;
        Ok(value)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Проверяет, что payload прочитан до конца.
    pub fn expect_end(&self) -> RserResult<()> {
        if self.remaining() != 0 {
            return Err(RserError::TrailingBytes {
                remaining: self.remaining() as u64,
                offset: Some(self.pos as u64),
            }
            .into());
        }
        Ok(())
    }

    fn take(
        &mut self,
        n: usize,
        context: &'static str,
    ) -> RserResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(RserError::UnexpectedEof {
                context: format!("reading {context}"),
                offset: Some(self.pos as u64),
                expected_bytes: Some(n as u64),
                got_bytes: Some(self.remaining() as u64),
            }
            .into());
        }
        let data: &'a [u8] = self.data;
        let slice = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> RserResult<u8> {
        Ok(self.take(1, "u8")?[0])
    }

    pub fn read_u32(&mut self) -> RserResult<u32> {
        Ok(BigEndian::read_u32(self.take(4, "u32")?))
    }

    pub fn read_int(
        &mut self,
        width: IntWidth,
    ) -> RserResult<i64> {
        let bytes = self.take(width.size(), "integer")?;
        Ok(match width {
            IntWidth::I8 => bytes[0] as i8 as i64,
            IntWidth::I16 => BigEndian::read_i16(bytes) as i64,
            IntWidth::I32 => BigEndian::read_i32(bytes) as i64,
            IntWidth::I64 => BigEndian::read_i64(bytes),
        })
    }

    pub fn read_float(&mut self) -> RserResult<f64> {
        Ok(BigEndian::read_f64(self.take(8, "f64")?))
    }

    /// Читает `len` байт как UTF-8 строку.
    pub fn read_str(
        &mut self,
        len: usize,
    ) -> RserResult<String> {
        let start = self.pos;
        let bytes = self.take(len, "string")?;
        std::str::from_utf8(bytes).map(str::to_owned).map_err(|_| {
            RserError::InvalidUtf8 {
                what: "string".to_string(),
                offset: Some(start as u64),
            }
            .into()
        })
    }

    pub fn read_bytes(
        &mut self,
        len: usize,
    ) -> RserResult<&'a [u8]> {
        self.take(len, "bytes")
    }

    /// Строка с префиксом длины.
    fn read_prefixed_str(&mut self) -> RserResult<String> {
        let len = self.read_u32()? as usize;
        self.read_str(len)
    }

    /// Количество элементов контейнера. Каждый элемент занимает минимум
    /// `min_item` байт, так что количество сверяется с остатком до
    /// выделения памяти.
    fn read_count(
        &mut self,
        structure: &'static str,
        min_item: usize,
    ) -> RserResult<usize> {
        let start = self.pos;
        let count = self.read_u32()? as usize;
        if count.saturating_mul(min_item) > self.remaining() {
            return Err(RserError::ParseError {
                structure: structure.to_string(),
                reason: format!(
                    "{count} elements announced, only {} bytes left",
                    self.remaining()
                ),
                offset: Some(start as u64),
            }
            .into());
        }
        Ok(count)
    }

    fn read_flag(
        &mut self,
        structure: &'static str,
    ) -> RserResult<bool> {
        let start = self.pos;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(RserError::ParseError {
                structure: structure.to_string(),
                reason: format!("flag byte must be 0 or 1, got {other}"),
                offset: Some(start as u64),
            }
            .into()),
        }
    }

    fn register(
        &mut self,
        value: &Value,
    ) {
        self.refs.push(value.clone());
    }

    /// Читает одно значение с текущей позиции.
    pub fn read_value(&mut self) -> RserResult<Value> {
        self.read_at(0)
    }

    fn read_at(
        &mut self,
        depth: usize,
    ) -> RserResult<Value> {
        let start = self.pos;
        if depth > self.max_depth {
            return Err(RserError::DepthLimit {
                depth,
                limit: self.max_depth,
                offset: Some(start as u64),
            }
            .into());
        }

        let byte = self.read_u8()?;
        let tag = Tag::try_from(byte).map_err(|_| RserError::InvalidTag {
            tag: byte,
            offset: Some(start as u64),
        })?;

        match tag {
            Tag::Null => Ok(Value::Null),
            Tag::Undefined => Ok(Value::Undefined),
            Tag::Bool => Ok(Value::Bool(self.read_flag("bool")?)),
            Tag::Int8 | Tag::Int16 | Tag::Int32 | Tag::Int64 => {
                let width = IntWidth::from_tag(tag).ok_or_else(|| RserError::InvalidTag {
                    tag: byte,
                    offset: Some(start as u64),
                })?;
                Ok(Value::Int(self.read_int(width)?))
            }
            Tag::BigInt => {
                let digits_at = self.pos;
                let digits = self.read_prefixed_str()?;
                let n = digits.parse::<i128>().map_err(|e| RserError::ParseError {
                    structure: "bigint".to_string(),
                    reason: format!("{digits:?}: {e}"),
                    offset: Some(digits_at as u64),
                })?;
                Ok(Value::BigInt(n))
            }
            Tag::Float => Ok(Value::Float(self.read_float()?)),
            Tag::Str => Ok(Value::Str(self.read_prefixed_str()?)),
            Tag::Bytes => {
                let len = self.read_u32()? as usize;
                Ok(Value::Bytes(self.read_bytes(len)?.to_vec()))
            }
            Tag::Array | Tag::Set => {
                let count = self.read_count(if tag == Tag::Array { "array" } else { "set" }, 1)?;
                let items = Rc::new(RefCell::new(Vec::with_capacity(count)));
                let value = if tag == Tag::Array {
                    Value::Array(items.clone())
                } else {
                    Value::Set(items.clone())
                };
                self.register(&value);
                for _ in 0..count {
                    let item = self.read_at(depth + 1)?;
                    items.borrow_mut().push(item);
                }
                Ok(value)
            }
            Tag::Map => {
                let count = self.read_count("map", 2)?;
                let entries = Rc::new(RefCell::new(Vec::with_capacity(count)));
                let value = Value::Map(entries.clone());
                self.register(&value);
                for _ in 0..count {
                    let k = self.read_at(depth + 1)?;
                    let v = self.read_at(depth + 1)?;
                    entries.borrow_mut().push((k, v));
                }
                Ok(value)
            }
            Tag::Object => {
                let count = self.read_count("object", 5)?;
                let entries = Rc::new(RefCell::new(Vec::with_capacity(count)));
                let value = Value::Object(entries.clone());
                self.register(&value);
                for _ in 0..count {
                    let k = self.read_prefixed_str()?;
                    let v = self.read_at(depth + 1)?;
                    entries.borrow_mut().push((k, v));
                }
                Ok(value)
            }
            Tag::Date => {
                let value = Value::Date(Rc::new(DateValue {
                    millis: self.read_float()?,
                }));
                self.register(&value);
                Ok(value)
            }
            Tag::RegExp => {
                let source = self.read_prefixed_str()?;
                let flags = self.read_prefixed_str()?;
                let value = Value::RegExp(Rc::new(RegExpValue { source, flags }));
                self.register(&value);
                Ok(value)
            }
            Tag::Error => {
                let name = self.read_prefixed_str()?;
                let message = self.read_prefixed_str()?;
                let stack = if self.read_flag("error")? {
                    Some(self.read_prefixed_str()?)
                } else {
                    None
                };
                let value = Value::Error(Rc::new(ErrorValue {
                    name,
                    message,
                    stack,
                }));
                self.register(&value);
                Ok(value)
            }
            Tag::Reference => {
                let id = self.read_u32()?;
                self.refs.get(id as usize).cloned().ok_or_else(|| {
                    RserError::InvalidReference {
                        id,
                        known: self.refs.len() as u32,
                        offset: Some(start as u64),
                    }
                    .into()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rser_error::StatusCode;

    use super::*;
    use crate::rser::tags::*;

    fn parse(data: &[u8]) -> RserResult<Value> {
        BufferParser::parse(data, DEFAULT_MAX_DEPTH)
    }

    #[test]
    fn test_read_scalars() {
        assert_eq!(parse(&[TAG_NULL]).unwrap(), Value::Null);
        assert_eq!(parse(&[TAG_INT8, 0xFE]).unwrap(), Value::Int(-2));
        assert_eq!(parse(&[TAG_INT16, 0x01, 0x2C]).unwrap(), Value::Int(300));
        assert_eq!(
            parse(&[TAG_STR, 0, 0, 0, 2, b'o', b'k']).unwrap(),
            Value::from("ok")
        );

        let mut big = vec![TAG_BIGINT, 0, 0, 0, 3];
        big.extend_from_slice(b"-42");
        assert!(matches!(parse(&big).unwrap(), Value::BigInt(-42)));
    }

    /// Тест проверяет, что самоссылка восстанавливается как та же аллокация.
    #[test]
    fn test_self_reference_restored() {
        let data = [TAG_ARRAY, 0, 0, 0, 1, TAG_REFERENCE, 0, 0, 0, 0];
        let v = parse(&data).unwrap();
        assert!(v.index(0).unwrap().is_same(&v));
    }

    #[test]
    fn test_unknown_tag() {
        let err = parse(&[0x7F]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidTag);
        assert!(err.to_string().contains("0x7F"));
    }

    /// Тест проверяет ссылку вперёд: объект ещё не декодирован.
    #[test]
    fn test_forward_reference_rejected() {
        let data = [TAG_ARRAY, 0, 0, 0, 1, TAG_REFERENCE, 0, 0, 0, 5];
        let err = parse(&data).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidReference);
    }

    #[test]
    fn test_invalid_utf8() {
        let err = parse(&[TAG_STR, 0, 0, 0, 2, 0xC3, 0x28]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidUtf8);
    }

    #[test]
    fn test_truncated_payload() {
        let err = parse(&[TAG_STR, 0, 0, 0, 9, b'a']).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UnexpectedEof);
    }

    /// Тест проверяет, что огромный count не приводит к выделению памяти.
    #[test]
    fn test_huge_count_rejected_before_allocation() {
        let err = parse(&[TAG_ARRAY, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::ParseError);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let err = parse(&[TAG_NULL, TAG_NULL]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidFrame);
    }

    #[test]
    fn test_depth_limit() {
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&[TAG_ARRAY, 0, 0, 0, 1]);
        }
        data.push(TAG_NULL);

        assert!(BufferParser::parse(&data, 4).is_ok());
        let err = BufferParser::parse(&data, 3).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::DepthLimit);
    }

    fn bigint_payload(digits: &str) -> Vec<u8> {
        let mut data = vec![TAG_BIGINT];
        data.extend_from_slice(&(digits.len() as u32).to_be_bytes());
        data.extend_from_slice(digits.as_bytes());
        data
    }

    /// Тест проверяет границу BigInt: весь диапазон i128 читается, более
    /// длинное число отклоняется ошибкой разбора, а не обрезается.
    #[test]
    fn test_bigint_range() {
        let max = parse(&bigint_payload(&i128::MAX.to_string())).unwrap();
        assert!(matches!(max, Value::BigInt(n) if n == i128::MAX));
        let min = parse(&bigint_payload(&i128::MIN.to_string())).unwrap();
        assert!(matches!(min, Value::BigInt(n) if n == i128::MIN));

        let err = parse(&bigint_payload(&"1".repeat(40))).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::ParseError);
        assert!(err.to_string().contains("bigint"));
    }

    #[test]
    fn test_bad_bool_byte() {
        let err = parse(&[TAG_BOOL, 2]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::ParseError);
    }
}
