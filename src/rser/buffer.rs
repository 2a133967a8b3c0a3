use byteorder::{BigEndian, ByteOrder};
use rser_error::{RserError, RserResult};

use super::{
    counting::{CountingSink, ReferenceTable},
    sink::{wire_len, write_value, Sink},
    tags::{stream_header, MESSAGE_HEADER_LEN},
};
use crate::value::Value;

/// Второй проход кодировщика: пишет байты в буфер точного размера.
///
/// Таблица ссылок берётся из [`CountingSink`]. Объект считается уже
/// записанным, если его id меньше собственного счётчика прохода; при
/// регистрации id из таблицы обязан совпасть со счётчиком. Любое
/// расхождение проходов, как и выход за границу буфера, даёт
/// `InvariantViolation`.
#[derive(Debug)]
pub struct BufferSink {
    buf: Vec<u8>,
    offset: usize,
    refs: ReferenceTable,
    next_id: u32,
}

impl BufferSink {
    pub fn new(
        capacity: usize,
        refs: ReferenceTable,
    ) -> Self {
        Self {
            buf: vec![0u8; capacity],
            offset: 0,
            refs,
            next_id: 0,
        }
    }

    /// Кодирует значение в готовое сообщение по результатам подсчёта.
    ///
    /// Вывод: `[StreamHeader?][MessageHeader][Payload]`.
    pub fn encode(
        value: &Value,
        counted: CountingSink,
        with_stream_header: bool,
    ) -> RserResult<Vec<u8>> {
        let total = counted.total_size();
        let payload_len = wire_len(counted.payload_size(), "message")?;
        let mut sink = Self::new(total, counted.into_references());

        if with_stream_header {
            sink.write_raw(&stream_header())?;
        }
        let mut header = [0u8; MESSAGE_HEADER_LEN];
        BigEndian::write_u32(&mut header, payload_len);
        sink.write_raw(&header)?;

        write_value(&mut sink, value)?;
        sink.finish()
    }

    /// Текущая позиция записи.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Возвращает буфер, если он заполнен ровно до конца.
    pub fn finish(self) -> RserResult<Vec<u8>> {
        if self.offset != self.buf.len() {
            return Err(RserError::InvariantViolation {
                reason: format!(
                    "buffer pass wrote {} of {} counted bytes",
                    self.offset,
                    self.buf.len()
                ),
                offset: Some(self.offset as u64),
            }
            .into());
        }
        Ok(self.buf)
    }
}

impl Sink for BufferSink {
    fn write_raw(
        &mut self,
        bytes: &[u8],
    ) -> RserResult<()> {
        let end = self.offset + bytes.len();
        if end > self.buf.len() {
            return Err(RserError::InvariantViolation {
                reason: format!(
                    "write of {} bytes overflows buffer of {}",
                    bytes.len(),
                    self.buf.len()
                ),
                offset: Some(self.offset as u64),
            }
            .into());
        }
        self.buf[self.offset..end].copy_from_slice(bytes);
        self.offset = end;
        Ok(())
    }

    fn lookup_reference(
        &self,
        identity: usize,
    ) -> Option<u32> {
        self.refs
            .get(&identity)
            .copied()
            .filter(|&id| id < self.next_id)
    }

    fn on_reference_create(
        &mut self,
        identity: usize,
    ) -> RserResult<()> {
        match self.refs.get(&identity) {
            Some(&id) if id == self.next_id => {
                self.next_id += 1;
                Ok(())
            }
            other => Err(RserError::InvariantViolation {
                reason: format!(
                    "reference table mismatch: expected id {}, counted {:?}",
                    self.next_id, other
                ),
                offset: Some(self.offset as u64),
            }
            .into()),
        }
    }
}
