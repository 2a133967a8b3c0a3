use std::collections::HashMap;

use rser_error::{RserError, RserResult};
use sha2::{Digest, Sha256};

use super::{
    sink::{wire_len, write_value, Sink},
    tags::TAG_STR,
};
use crate::value::Value;

/// Приёмник, который вместо байтов считает SHA-256 от содержимого.
///
/// Хешируется только payload: ни потоковый заголовок, ни заголовок
/// сообщения в дайджест не попадают. Префиксы длин строк сохраняются, иначе
/// `["ab", "c"]` и `["a", "bc"]` дали бы одинаковый поток байтов.
#[derive(Default)]
pub struct HashSink {
    hasher: Sha256,
    refs: HashMap<usize, u32>,
}

impl HashSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Хеш значения в виде lowercase hex.
    pub fn hash(value: &Value) -> RserResult<String> {
        if let Value::Str(s) = value {
            return Self::hash_str(s);
        }
        let mut sink = Self::new();
        write_value(&mut sink, value)?;
        Ok(sink.digest())
    }

    /// Быстрый путь для строки верхнего уровня: без обхода и без таблицы
    /// ссылок. Результат совпадает с общим путём.
    pub fn hash_str(s: &str) -> RserResult<String> {
        let len = wire_len(s.len(), "string")?;
        let mut hasher = Sha256::new();
        hasher.update([TAG_STR]);
        hasher.update(len.to_be_bytes());
        hasher.update(s.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn digest(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

impl Sink for HashSink {
    fn write_raw(
        &mut self,
        bytes: &[u8],
    ) -> RserResult<()> {
        self.hasher.update(bytes);
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
