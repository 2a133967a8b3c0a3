use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rser::{encode_message, encode_stream, rser::CountingSink};

#[path = "fixtures.rs"]
mod fixtures;

fn bench_encode_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_message");
    for files in [10usize, 100, 1000] {
        let value = fixtures::cache_entry(files);
        let size = encode_message(&value).unwrap().len();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(files), &value, |b, v| {
            b.iter(|| black_box(encode_message(black_box(v)).unwrap()))
        });
    }
    group.finish();
}

/// Только первый проход: подсчёт размера и таблица ссылок.
fn bench_counting_pass(c: &mut Criterion) {
    let value = fixtures::cache_entry(1000);
    c.bench_function("counting pass 1000 files", |b| {
        b.iter(|| black_box(CountingSink::measure(black_box(&value), true).unwrap()))
    });
}

fn bench_encode_long_string(c: &mut Criterion) {
    let value = fixtures::long_string(64 * 1024);
    c.bench_function("encode_stream 64KiB string", |b| {
        b.iter(|| black_box(encode_stream(black_box(&value)).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_encode_message,
    bench_counting_pass,
    bench_encode_long_string
);
criterion_main!(benches);
