use std::collections::HashMap;

use rser_error::{RserError, RserResult};

use super::{
    sink::{write_value, Sink},
    tags::{MESSAGE_HEADER_LEN, STREAM_HEADER_LEN},
};
use crate::value::Value;

/// Таблица ссылок: идентичность объекта → id в порядке прямого обхода.
pub type ReferenceTable = HashMap<usize, u32>;

/// Первый проход кодировщика: считает точный размер вывода и строит таблицу
/// ссылок. Байтов не производит.
#[derive(Debug, Default)]
pub struct CountingSink {
    size: usize,
    header_size: usize,
    refs: ReferenceTable,
}

impl CountingSink {
    /// Начинает подсчёт с учётом заголовка сообщения и, если нужно,
    /// потокового заголовка.
    pub fn new(with_stream_header: bool) -> Self {
        let header_size = MESSAGE_HEADER_LEN
            + if with_stream_header {
                STREAM_HEADER_LEN
            } else {
                0
            };
        Self {
            size: header_size,
            header_size,
            refs: ReferenceTable::new(),
        }
    }

    /// Измеряет значение.
    pub fn measure(
        value: &Value,
        with_stream_header: bool,
    ) -> RserResult<Self> {
        let mut sink = Self::new(with_stream_header);
        write_value(&mut sink, value)?;
        Ok(sink)
    }

    /// Полный размер вывода вместе с заголовками.
    pub fn total_size(&self) -> usize {
        self.size
    }

    /// Размер payload без заголовков.
    pub fn payload_size(&self) -> usize {
        self.size - self.header_size
    }

    /// Сколько объектов попало в таблицу ссылок.
    pub fn reference_count(&self) -> usize {
        self.refs.len()
    }

    pub fn into_references(self) -> ReferenceTable {
        self.refs
    }
}

impl Sink for CountingSink {
    fn write_raw(
        &mut self,
        bytes: &[u8],
    ) -> RserResult<()> {
        self.size = self.size.checked_add(bytes.len()).ok_or_else(|| {
            RserError::UnsupportedValue {
                what: "message".to_string(),
                reason: "encoded size overflows usize".to_string(),
            }
        })?;
        Ok(())
    }

    fn lookup_reference(
        &self,
        identity: usize,
    ) -> Option<u32> {
        self.refs.get(&identity).copied()
    }

    fn on_reference_create(
        &mut self,
        identity: usize,
    ) -> RserResult<()> {
        let id = u32::try_from(self.refs.len()).map_err(|_| RserError::UnsupportedValue {
            what: "reference table".to_string(),
            reason: "more than u32::MAX distinct objects".to_string(),
        })?;
        self.refs.insert(identity, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет размер с заголовками и без.
    #[test]
    fn test_sizes_include_headers() {
        let v = Value::from("abc");
        let plain = CountingSink::measure(&v, false).unwrap();
        let framed = CountingSink::measure(&v, true).unwrap();

        // tag + u32 len + 3 bytes
        assert_eq!(plain.payload_size(), 8);
        assert_eq!(plain.total_size(), 8 + MESSAGE_HEADER_LEN);
        assert_eq!(framed.total_size(), 8 + MESSAGE_HEADER_LEN + STREAM_HEADER_LEN);
        assert_eq!(framed.payload_size(), 8);
    }

    /// Тест проверяет, что id раздаются в порядке прямого обхода.
    #[test]
    fn test_reference_ids_in_preorder() {
        let inner = Value::array(Vec::new());
        let date = Value::date(0.0);
        let root = Value::object([("x", inner.clone()), ("d", date.clone()), ("y", inner.clone())]);

        let sink = CountingSink::measure(&root, false).unwrap();
        assert_eq!(sink.reference_count(), 3);

        let refs = sink.into_references();
        assert_eq!(refs[&root.identity().unwrap()], 0);
        assert_eq!(refs[&inner.identity().unwrap()], 1);
        assert_eq!(refs[&date.identity().unwrap()], 2);
    }

    /// Тест проверяет, что скаляры не попадают в таблицу.
    #[test]
    fn test_scalars_have_no_ids() {
        let root = Value::array(vec![Value::Int(1), Value::from("s"), Value::Null]);
        let sink = CountingSink::measure(&root, false).unwrap();
        assert_eq!(sink.reference_count(), 1);
    }
}
