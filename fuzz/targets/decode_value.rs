#![no_main]

use libfuzzer_sys::fuzz_target;
use rser::{
    deep_eq, encode_message,
    rser::{BufferParser, DEFAULT_MAX_DEPTH},
};

fuzz_target!(|data: &[u8]| {
    // Парсер не должен паниковать ни на каких данных.
    let Ok(value) = BufferParser::parse(data, DEFAULT_MAX_DEPTH) else {
        return;
    };

    // Всё, что удалось разобрать, кодируется обратно и даёт тот же граф.
    let encoded = encode_message(&value).expect("re-encoding a decoded value failed");
    let reparsed = BufferParser::parse(&encoded[4..], DEFAULT_MAX_DEPTH)
        .expect("re-encoded payload does not parse");
    assert!(deep_eq(&value, &reparsed), "roundtrip changed the graph");
});
