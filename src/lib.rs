//! RSER: бинарная сериализация графов значений.
//!
//! Формат сохраняет идентичность объектов и циклы через таблицу ссылок,
//! заранее вычисляет точный размер вывода, умеет вместо байтов выдавать
//! SHA-256 содержимого и декодирует поток, нарезанный на куски
//! произвольной длины.

/// Settings loaded from defaults and `RSER_*` environment variables.
pub mod config;
/// Logging setup on top of `tracing`.
pub mod logging;
/// Wire format: sinks, parser, stream decoder, high-level API.
pub mod rser;
/// In-memory value graph.
pub mod value;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use config::RserSettings;
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
pub use rser::{
    decode_file_stream, decode_file_stream_with, decode_messages, decode_stream, encode_message,
    encode_stream, hash_value, write_stream, write_value_file, Decoded, DecoderState, DecoderStats,
    FileDecode, StreamDecoder, StreamWriter,
};
/// Errors and result types.
pub use rser_error::{ErrorExt, RserError, RserResult, StackError, StatusCode, VersionError};
pub use value::{deep_eq, Value};
