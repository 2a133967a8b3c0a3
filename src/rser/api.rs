//! Высокоуровневый API: кодирование, хеширование и чтение файлов.

use std::{io::Write, path::Path};

use rser_error::{ResultExt, RserError, RserResult};
use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

use super::{
    buffer::BufferSink,
    counting::CountingSink,
    decoder::{Decoded, StreamDecoder},
    hash::HashSink,
    tags::stream_header,
};
use crate::{config::RserSettings, value::Value};

/// Итог чтения файла с потоком RSER.
#[derive(Debug, PartialEq)]
pub enum FileDecode {
    Value(Value),
    /// Файл записан неизвестной версией формата; значение нужно пересчитать.
    Incompatible { found: u8 },
}

/// Кодирует одно сообщение без потокового заголовка:
/// `[MessageHeader][Payload]`.
pub fn encode_message(value: &Value) -> RserResult<Vec<u8>> {
    encode(value, false)
}

/// Кодирует одно сообщение с потоковым заголовком:
/// `[StreamHeader][MessageHeader][Payload]`.
pub fn encode_stream(value: &Value) -> RserResult<Vec<u8>> {
    encode(value, true)
}

fn encode(
    value: &Value,
    with_stream_header: bool,
) -> RserResult<Vec<u8>> {
    let counted = CountingSink::measure(value, with_stream_header)?;
    trace!(
        kind = value.kind(),
        size = counted.total_size(),
        references = counted.reference_count(),
        "RSER value measured"
    );
    BufferSink::encode(value, counted, with_stream_header)
}

/// SHA-256 содержимого значения в hex.
pub fn hash_value(value: &Value) -> RserResult<String> {
    HashSink::hash(value)
}

/// Читает файл потока и возвращает первое значение (или несовместимость).
pub async fn decode_file_stream(path: impl AsRef<Path>) -> RserResult<FileDecode> {
    decode_file_stream_with(path, &RserSettings::default()).await
}

/// То же, что [`decode_file_stream`], с явными лимитами и размером куска.
pub async fn decode_file_stream_with(
    path: impl AsRef<Path>,
    settings: &RserSettings,
) -> RserResult<FileDecode> {
    let path = path.as_ref();
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;

    let mut decoder = StreamDecoder::new().with_settings(settings);
    let mut chunk = vec![0u8; settings.read_chunk_size.max(1)];

    loop {
        let n = file
            .read(&mut chunk)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        if n == 0 {
            break;
        }

        if let Some(outcome) = decoder.append(&chunk[..n]).into_iter().next() {
            let decoded = outcome.with_context(|| format!("decoding {}", path.display()))?;
            debug!(
                path = %path.display(),
                bytes = decoder.stats().bytes_received,
                "RSER file decoded"
            );
            return Ok(match decoded {
                Decoded::Value(v) => FileDecode::Value(v),
                Decoded::Incompatible { found } => FileDecode::Incompatible { found },
            });
        }
    }

    decoder
        .finish()
        .with_context(|| format!("decoding {}", path.display()))?;
    Err(RserError::UnexpectedEof {
        context: "stream ended without a value".to_string(),
        offset: Some(decoder.stats().bytes_consumed),
        expected_bytes: None,
        got_bytes: None,
    })
    .with_context(|| format!("decoding {}", path.display()))
}

/// Сохраняет значение в отдельный файл (потоковый заголовок + сообщение).
pub fn write_value_file(
    path: impl AsRef<Path>,
    value: &Value,
) -> RserResult<()> {
    let path = path.as_ref();
    let bytes = encode_stream(value)?;
    std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    debug!(path = %path.display(), bytes = bytes.len(), "RSER file written");
    Ok(())
}

/// Пишет поток: заголовок один раз, затем по сообщению на значение.
///
/// Возвращает число записанных байт.
pub fn write_stream<'v, W: Write>(
    w: W,
    values: impl IntoIterator<Item = &'v Value>,
) -> RserResult<u64> {
    let mut writer = StreamWriter::new(w);
    for v in values {
        writer.write(v)?;
    }
    let written = writer.bytes_written();
    writer.finish()?;
    Ok(written)
}

/// Инкрементальная запись потока сообщений.
///
/// Потоковый заголовок пишется перед первым сообщением или в
/// [`finish`](StreamWriter::finish), если сообщений не было.
pub struct StreamWriter<W: Write> {
    inner: W,
    header_written: bool,
    messages: u64,
    bytes: u64,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            header_written: false,
            messages: 0,
            bytes: 0,
        }
    }

    fn ensure_header(&mut self) -> RserResult<()> {
        if !self.header_written {
            let header = stream_header();
            self.inner.write_all(&header)?;
            self.bytes += header.len() as u64;
            self.header_written = true;
        }
        Ok(())
    }

    /// Кодирует и дописывает одно сообщение.
    pub fn write(
        &mut self,
        value: &Value,
    ) -> RserResult<()> {
        let message = encode_message(value)
            .with_context(|| format!("encoding message #{}", self.messages))?;
        self.ensure_header()?;
        self.inner.write_all(&message)?;
        self.bytes += message.len() as u64;
        self.messages += 1;
        Ok(())
    }

    pub fn messages_written(&self) -> u64 {
        self.messages
    }

    /// Байт записано на данный момент (с учётом ещё не записанного
    /// заголовка, если сообщений не было).
    pub fn bytes_written(&self) -> u64 {
        if self.header_written {
            self.bytes
        } else {
            stream_header().len() as u64
        }
    }

    /// Дописывает заголовок при необходимости, сбрасывает буферы и
    /// возвращает внутренний writer.
    pub fn finish(mut self) -> RserResult<W> {
        self.ensure_header()?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Декодирует все сообщения из буфера без потокового заголовка.
pub fn decode_messages(bytes: &[u8]) -> RserResult<Vec<Value>> {
    let mut decoder = StreamDecoder::messages_only();
    let mut values = Vec::new();
    for outcome in decoder.append(bytes) {
        match outcome? {
            Decoded::Value(v) => values.push(v),
            Decoded::Incompatible { found } => {
                return Err(RserError::ParseError {
                    structure: "message sequence".to_string(),
                    reason: format!("unexpected version marker {found}"),
                    offset: None,
                }
                .into())
            }
        }
    }
    decoder.finish()?;
    Ok(values)
}

/// Декодирует поток с заголовком из буфера.
///
/// Несовместимая версия возвращается как единственный элемент
/// `Decoded::Incompatible`, а не как ошибка.
pub fn decode_stream(bytes: &[u8]) -> RserResult<Vec<Decoded>> {
    let mut decoder = StreamDecoder::new();
    let out = decoder
        .append(bytes)
        .into_iter()
        .collect::<RserResult<Vec<_>>>()?;
    decoder.finish()?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use rser_error::StatusCode;

    use super::*;
    use crate::rser::sink::Sink;

    /// Конкретный сценарий: {a: [1, 2, "héllo"], self: <self>}.
    fn sample() -> Value {
        let root = Value::object([(
            "a",
            Value::array(vec![Value::Int(1), Value::Int(2), Value::from("héllo")]),
        )]);
        root.insert("self", root.clone());
        root
    }

    /// Тест проверяет круговой путь для объекта со ссылкой на себя и
    /// сохранение идентичности.
    #[test]
    fn test_self_referencing_object_roundtrip() {
        let v = sample();
        let bytes = encode_stream(&v).unwrap();
        let decoded = decode_stream(&bytes).unwrap();

        assert_eq!(decoded.len(), 1);
        let Decoded::Value(out) = &decoded[0] else {
            panic!("expected a value");
        };
        assert_eq!(out, &v);
        assert!(out.get("self").unwrap().is_same(out));
        assert_eq!(
            out.get("a").unwrap().index(2).unwrap().as_str(),
            Some("héllo")
        );
    }

    /// Тест проверяет точную раскладку сценария до байта.
    #[test]
    fn test_sample_exact_bytes() {
        let bytes = encode_message(&sample()).unwrap();
        let mut payload = vec![
            0x0E, 0, 0, 0, 2, // object, 2 поля
            0, 0, 0, 1, b'a', // ключ "a"
            0x0B, 0, 0, 0, 3, // array, 3 элемента
            0x04, 1, 0x04, 2, // int8 1, int8 2
            0x0A, 0, 0, 0, 6, // str, 6 байт
        ];
        payload.extend_from_slice("héllo".as_bytes());
        payload.extend_from_slice(&[0, 0, 0, 4]);
        payload.extend_from_slice(b"self");
        payload.extend_from_slice(&[0x13, 0, 0, 0, 0]);

        let mut expected = (payload.len() as u32).to_be_bytes().to_vec();
        expected.extend(payload);
        assert_eq!(bytes, expected);
    }

    /// Тест проверяет, что хеш детерминирован и чувствителен к изменениям.
    #[test]
    fn test_hash_determinism_and_sensitivity() {
        let a = sample();
        let b = sample();
        assert_eq!(hash_value(&a).unwrap(), hash_value(&b).unwrap());

        b.insert("extra", Value::Null);
        assert_ne!(hash_value(&a).unwrap(), hash_value(&b).unwrap());
    }

    /// Тест проверяет, что хеш не зависит от фрейминга.
    #[test]
    fn test_hash_ignores_framing() {
        let v = Value::from("x");
        let framed_payload = encode_message(&v).unwrap()[4..].to_vec();
        let mut direct = HashSink::new();
        direct.write_raw(&framed_payload).unwrap();
        assert_eq!(hash_value(&v).unwrap(), direct.digest());
    }

    #[test]
    fn test_stream_writer_and_decode() {
        let values = vec![Value::Int(1), Value::from("two"), sample()];
        let mut out = Vec::new();
        let written = write_stream(&mut out, &values).unwrap();
        assert_eq!(written, out.len() as u64);

        let decoded = decode_stream(&out).unwrap();
        let got: Vec<Value> = decoded
            .into_iter()
            .map(|d| match d {
                Decoded::Value(v) => v,
                Decoded::Incompatible { .. } => panic!("unexpected incompatibility"),
            })
            .collect();
        assert_eq!(got, values);
    }

    #[test]
    fn test_empty_stream_writer() {
        let out = StreamWriter::new(Vec::new()).finish().unwrap();
        assert_eq!(out, b"RSER\x01".to_vec());
        assert!(decode_stream(&out).unwrap().is_empty());
    }

    #[test]
    fn test_decode_messages() {
        let mut bytes = encode_message(&Value::Bool(true)).unwrap();
        bytes.extend(encode_message(&Value::Undefined).unwrap());
        assert_eq!(
            decode_messages(&bytes).unwrap(),
            vec![Value::Bool(true), Value::Undefined]
        );

        let err = decode_messages(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::TruncatedStream);
    }
}
