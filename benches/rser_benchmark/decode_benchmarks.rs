use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rser::{encode_stream, StreamDecoder};

#[path = "fixtures.rs"]
mod fixtures;

fn decode_all(
    bytes: &[u8],
    chunk: usize,
) -> usize {
    let mut decoder = StreamDecoder::new();
    let mut n = 0;
    for piece in bytes.chunks(chunk) {
        n += decoder.append(piece).len();
    }
    decoder.finish().unwrap();
    n
}

/// Декодирование одного и того же потока при разной нарезке.
fn bench_decode_chunked(c: &mut Criterion) {
    let bytes = encode_stream(&fixtures::cache_entry(1000)).unwrap();
    let mut group = c.benchmark_group("stream_decoder");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    for chunk in [64usize, 4096, bytes.len()] {
        group.bench_with_input(BenchmarkId::new("chunk", chunk), &chunk, |b, &chunk| {
            b.iter(|| black_box(decode_all(black_box(&bytes), chunk)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode_chunked);
criterion_main!(benches);
