//! Бинарный формат значений RSER.
//!
//! ## Архитектура
//!
//! Кодирование идёт в два прохода по одному и тому же обходу
//! ([`sink::write_value`]):
//!
//! 1. [`CountingSink`] считает точный размер и строит таблицу ссылок;
//! 2. [`BufferSink`] пишет байты в буфер ровно этого размера, сверяясь с
//!    таблицей.
//!
//! Тот же обход, направленный в [`HashSink`], даёт SHA-256 содержимого.
//!
//! Декодирование: [`StreamDecoder`] принимает байты кусками произвольной
//! длины, выделяет сообщения и отдаёт payload в [`BufferParser`].
//!
//! ```no_run
//! use rser::{decode_stream, encode_stream, Value};
//!
//! let v = Value::object([("answer", Value::Int(42))]);
//! v.insert("self", v.clone());
//!
//! let bytes = encode_stream(&v)?;
//! let decoded = decode_stream(&bytes)?;
//! # Ok::<(), rser::StackError>(())
//! ```
//!
//! ## Модули
//!
//! - [`tags`] — теги значений и константы фрейминга;
//! - [`sink`] — трейт приёмника и общий обход;
//! - [`counting`], [`buffer`], [`hash`] — три приёмника;
//! - [`parser`] — разбор payload;
//! - [`decoder`] — потоковый декодер;
//! - [`api`] — функции верхнего уровня.

pub mod api;
pub mod buffer;
pub mod counting;
pub mod decoder;
pub mod hash;
pub mod parser;
pub mod sink;
pub mod tags;

pub use api::*;
pub use buffer::*;
pub use counting::*;
pub use decoder::*;
pub use hash::*;
pub use parser::*;
pub use sink::*;
pub use tags::*;
