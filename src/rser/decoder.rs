//! Потоковый декодер RSER, независимый от границ чанков.
//!
//! Байты приходят кусками произвольной длины (сокет, файл). Декодер
//! накапливает их в одном `BytesMut` и проходит конечный автомат:
//!
//! - `AwaitingStreamHeader` — ждёт 5 байт маркера и версии;
//! - `AwaitingMessageHeader` — ждёт 4 байта длины payload;
//! - `AwaitingPayload { len }` — ждёт `len` байт и разбирает сообщение;
//! - `Incompatible` / `Errored` — терминальные, дальнейший ввод игнорируется.
//!
//! Результат не зависит от того, как поток был нарезан: одни и те же байты,
//! поданные одним куском или по одному байту, дают одну и ту же
//! последовательность значений.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use bytes::{Buf, BytesMut};
use rser_error::{ResultExt, RserError, RserResult, StackError};
use tracing::{debug, trace, warn};

use super::{
    parser::BufferParser,
    sink::DEFAULT_MAX_DEPTH,
    tags::{FormatVersion, MESSAGE_HEADER_LEN, STREAM_HEADER_LEN, STREAM_MAGIC},
};
use crate::{config::RserSettings, logging::log_error, value::Value};

/// Предел размера одного сообщения по умолчанию (512 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 512 * 1024 * 1024;

/// Состояние декодера.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    AwaitingStreamHeader,
    AwaitingMessageHeader,
    AwaitingPayload { len: u32 },
    /// Поток записан неизвестной версией формата.
    Incompatible { found: u8 },
    /// Поток повреждён; ошибка уже отдана вызывающему.
    Errored,
}

impl DecoderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Incompatible { .. } | Self::Errored)
    }
}

impl fmt::Display for DecoderState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::AwaitingStreamHeader => f.write_str("AwaitingStreamHeader"),
            Self::AwaitingMessageHeader => f.write_str("AwaitingMessageHeader"),
            Self::AwaitingPayload { len } => write!(f, "AwaitingPayload({len})"),
            Self::Incompatible { found } => write!(f, "Incompatible(v{found})"),
            Self::Errored => f.write_str("Errored"),
        }
    }
}

/// Исход разбора, отдаваемый из [`StreamDecoder::append`].
#[derive(Debug, PartialEq)]
pub enum Decoded {
    /// Очередное значение в порядке поступления.
    Value(Value),
    /// Маркер распознан, версия нет. Отдаётся один раз.
    Incompatible { found: u8 },
}

/// Счётчики декодера.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecoderStats {
    /// Всего байт подано через `append`.
    pub bytes_received: u64,
    /// Байт разобрано (заголовки и payload).
    pub bytes_consumed: u64,
    pub messages_decoded: u64,
}

pub struct StreamDecoder {
    buffer: BytesMut,
    state: DecoderState,
    max_message_size: usize,
    max_depth: usize,
    stats: DecoderStats,
}

impl StreamDecoder {
    /// Декодер потока с потоковым заголовком.
    pub fn new() -> Self {
        Self::with_state(DecoderState::AwaitingStreamHeader)
    }

    /// Декодер последовательности сообщений без потокового заголовка.
    pub fn messages_only() -> Self {
        Self::with_state(DecoderState::AwaitingMessageHeader)
    }

    fn with_state(state: DecoderState) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            state,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            stats: DecoderStats::default(),
        }
    }

    /// Применяет лимиты из настроек.
    pub fn with_settings(
        mut self,
        settings: &RserSettings,
    ) -> Self {
        self.max_message_size = settings.max_message_size;
        self.max_depth = settings.max_depth;
        self
    }

    pub fn with_max_message_size(
        mut self,
        max: usize,
    ) -> Self {
        self.max_message_size = max;
        self
    }

    pub fn with_max_depth(
        mut self,
        max: usize,
    ) -> Self {
        self.max_depth = max;
        self
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Сколько байт ждут своей очереди в буфере.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Подаёт очередной кусок потока и возвращает всё, что из него удалось
    /// разобрать, в порядке поступления.
    ///
    /// После ошибки или несовместимости декодер терминален: последующие
    /// вызовы возвращают пустой вектор.
    pub fn append(
        &mut self,
        chunk: &[u8],
    ) -> Vec<RserResult<Decoded>> {
        let mut out = Vec::new();
        if self.state.is_terminal() {
            return out;
        }

        self.stats.bytes_received += chunk.len() as u64;
        self.buffer.extend_from_slice(chunk);

        loop {
            match self.step() {
                Ok(Some(decoded)) => {
                    let terminal = matches!(decoded, Decoded::Incompatible { .. });
                    out.push(Ok(decoded));
                    if terminal {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    log_error(&err, "RSER stream rejected");
                    self.state = DecoderState::Errored;
                    self.buffer.clear();
                    out.push(Err(err));
                    break;
                }
            }
        }
        out
    }

    /// Сообщает о конце потока. Ошибка, если в буфере остались байты
    /// незавершённого сообщения.
    pub fn finish(&mut self) -> RserResult<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        let mid_message = matches!(self.state, DecoderState::AwaitingPayload { .. });
        if mid_message || !self.buffer.is_empty() {
            let err = RserError::TruncatedStream {
                buffered: self.buffer.len() as u64,
                state: self.state.to_string(),
            };
            let err = StackError::from(err);
            log_error(&err, "RSER stream truncated");
            self.state = DecoderState::Errored;
            self.buffer.clear();
            return Err(err);
        }
        Ok(())
    }

    /// Пытается продвинуть автомат на один шаг.
    fn step(&mut self) -> RserResult<Option<Decoded>> {
        match self.state {
            DecoderState::AwaitingStreamHeader => {
                if self.buffer.len() < STREAM_HEADER_LEN {
                    return Ok(None);
                }
                let mut magic = [0u8; 4];
                magic.copy_from_slice(&self.buffer[..STREAM_MAGIC.len()]);
                if &magic != STREAM_MAGIC {
                    return Err(RserError::InvalidMagic {
                        expected: *STREAM_MAGIC,
                        got: magic,
                    }
                    .into());
                }

                let version = self.buffer[STREAM_MAGIC.len()];
                match FormatVersion::try_from(version) {
                    Ok(v) => {
                        debug!(version = v as u8, "RSER stream header accepted");
                        self.consume(STREAM_HEADER_LEN);
                        self.state = DecoderState::AwaitingMessageHeader;
                        self.step()
                    }
                    Err(e) => {
                        warn!(found = e.found(), "Incompatible RSER stream version");
                        self.state = DecoderState::Incompatible { found: e.found() };
                        self.buffer.clear();
                        Ok(Some(Decoded::Incompatible { found: e.found() }))
                    }
                }
            }

            DecoderState::AwaitingMessageHeader => {
                if self.buffer.len() < MESSAGE_HEADER_LEN {
                    return Ok(None);
                }
                let len = BigEndian::read_u32(&self.buffer[..MESSAGE_HEADER_LEN]);
                if len as usize > self.max_message_size {
                    return Err(RserError::SizeLimit {
                        what: "message".to_string(),
                        size: len as u64,
                        limit: self.max_message_size as u64,
                        offset: Some(self.stats.bytes_consumed),
                    }
                    .into());
                }
                self.consume(MESSAGE_HEADER_LEN);
                self.state = DecoderState::AwaitingPayload { len };
                self.step()
            }

            DecoderState::AwaitingPayload { len } => {
                let len = len as usize;
                if self.buffer.len() < len {
                    return Ok(None);
                }
                let payload = self.buffer.split_to(len);
                let offset = self.stats.bytes_consumed;
                self.stats.bytes_consumed += len as u64;
                self.state = DecoderState::AwaitingMessageHeader;

                let index = self.stats.messages_decoded;
                let value = BufferParser::parse(&payload, self.max_depth).with_context(|| {
                    format!("decoding message #{index} at stream offset {offset}")
                })?;
                self.stats.messages_decoded += 1;
                trace!(index, len, "RSER message decoded");
                Ok(Some(Decoded::Value(value)))
            }

            DecoderState::Incompatible { .. } | DecoderState::Errored => Ok(None),
        }
    }

    fn consume(
        &mut self,
        n: usize,
    ) {
        self.buffer.advance(n);
        self.stats.bytes_consumed += n as u64;
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rser_error::StatusCode;

    use super::*;
    use crate::rser::{encode_message, encode_stream};

    fn values(out: Vec<RserResult<Decoded>>) -> Vec<Value> {
        out.into_iter()
            .map(|r| match r.unwrap() {
                Decoded::Value(v) => v,
                other => panic!("unexpected {other:?}"),
            })
            .collect()
    }

    /// Тест проверяет, что побайтовая подача даёт тот же результат, что и
    /// подача целиком.
    #[test]
    fn test_byte_by_byte_equals_whole() {
        let v = Value::object([("a", Value::array(vec![Value::Int(1), Value::from("x")]))]);
        let bytes = encode_stream(&v).unwrap();

        let mut whole = StreamDecoder::new();
        let got_whole = values(whole.append(&bytes));

        let mut split = StreamDecoder::new();
        let mut got_split = Vec::new();
        for b in &bytes {
            got_split.extend(values(split.append(std::slice::from_ref(b))));
        }

        assert_eq!(got_whole, vec![v.clone()]);
        assert_eq!(got_split, vec![v]);
        assert!(whole.finish().is_ok());
        assert!(split.finish().is_ok());
    }

    /// Тест проверяет, что несколько сообщений в одном чанке отдаются по
    /// порядку.
    #[test]
    fn test_multiple_messages_in_order() {
        let mut bytes = encode_stream(&Value::Int(1)).unwrap();
        bytes.extend(encode_message(&Value::Int(2)).unwrap());
        bytes.extend(encode_message(&Value::Int(3)).unwrap());

        let mut dec = StreamDecoder::new();
        let got = values(dec.append(&bytes));
        assert_eq!(got, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(dec.stats().messages_decoded, 3);
        assert_eq!(dec.stats().bytes_consumed, bytes.len() as u64);
        assert_eq!(dec.buffered_len(), 0);
    }

    /// Тест проверяет, что неизвестная версия даёт Incompatible один раз.
    #[test]
    fn test_incompatible_version_signalled_once() {
        let mut dec = StreamDecoder::new();
        let out = dec.append(b"RSER\x09\x00\x00\x00\x01\x01");
        assert_eq!(out.len(), 1);
        assert_eq!(
            out.into_iter().next().unwrap().unwrap(),
            Decoded::Incompatible { found: 9 }
        );
        assert_eq!(dec.state(), DecoderState::Incompatible { found: 9 });
        assert!(dec.append(b"more").is_empty());
        assert!(dec.finish().is_ok());
    }

    #[test]
    fn test_unknown_magic_is_error() {
        let mut dec = StreamDecoder::new();
        let out = dec.append(b"JSON\x01");
        let err = out.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidFrame);
        assert_eq!(dec.state(), DecoderState::Errored);
        assert!(dec.append(b"\x00").is_empty());
    }

    /// Тест проверяет, что обрыв посреди сообщения обнаруживается на
    /// finish().
    #[test]
    fn test_truncated_stream() {
        let bytes = encode_stream(&Value::from("hello")).unwrap();
        let mut dec = StreamDecoder::new();
        assert!(dec.append(&bytes[..bytes.len() - 2]).is_empty());
        assert!(matches!(dec.state(), DecoderState::AwaitingPayload { .. }));

        let err = dec.finish().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::TruncatedStream);
    }

    /// Тест проверяет, что заголовок с огромной длиной отклоняется без
    /// буферизации.
    #[test]
    fn test_message_size_limit() {
        let mut dec = StreamDecoder::messages_only().with_max_message_size(16);
        let out = dec.append(&[0, 0, 1, 0]);
        let err = out.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::SizeLimit);
    }

    /// Тест проверяет, что ошибка разбора payload несёт номер сообщения.
    #[test]
    fn test_payload_error_has_context() {
        let mut dec = StreamDecoder::messages_only();
        let out = dec.append(&[0, 0, 0, 1, 0x7F]);
        let err = out.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidTag);
        assert!(err.contexts()[0].message.contains("message #0"));
    }
}
