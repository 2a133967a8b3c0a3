#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rser::StreamDecoder;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    data: Vec<u8>,
    /// Размеры кусков, на которые режется поток.
    splits: Vec<u8>,
    messages_only: bool,
}

fuzz_target!(|input: FuzzInput| {
    let mut whole = if input.messages_only {
        StreamDecoder::messages_only()
    } else {
        StreamDecoder::new()
    }
    .with_max_message_size(1 << 20);
    let expected: Vec<String> = whole
        .append(&input.data)
        .into_iter()
        .map(|r| format!("{r:?}"))
        .collect();

    let mut chunked = if input.messages_only {
        StreamDecoder::messages_only()
    } else {
        StreamDecoder::new()
    }
    .with_max_message_size(1 << 20);
    let mut got = Vec::new();
    let mut rest = input.data.as_slice();
    let mut sizes = input.splits.iter().map(|&s| s as usize + 1).cycle();
    while !rest.is_empty() {
        let n = sizes.next().unwrap_or(rest.len()).min(rest.len());
        let (chunk, tail) = rest.split_at(n);
        got.extend(chunked.append(chunk).into_iter().map(|r| format!("{r:?}")));
        rest = tail;
    }

    // Результат не зависит от того, как поток нарезан на куски.
    assert_eq!(expected, got);
    assert_eq!(whole.state(), chunked.state());
});
