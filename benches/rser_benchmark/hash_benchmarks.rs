use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rser::{hash_value, rser::HashSink};

#[path = "fixtures.rs"]
mod fixtures;

fn bench_hash_graph(c: &mut Criterion) {
    let value = fixtures::cache_entry(1000);
    c.bench_function("hash_value 1000 files", |b| {
        b.iter(|| black_box(hash_value(black_box(&value)).unwrap()))
    });
}

/// Быстрый путь строки против общего обхода.
fn bench_hash_string_paths(c: &mut Criterion) {
    let value = fixtures::long_string(64 * 1024);
    let mut group = c.benchmark_group("hash 64KiB string");
    group.bench_function("fast path", |b| {
        b.iter(|| black_box(hash_value(black_box(&value)).unwrap()))
    });
    group.bench_function("general traversal", |b| {
        b.iter(|| {
            let mut sink = HashSink::new();
            rser::rser::write_value(&mut sink, black_box(&value)).unwrap();
            black_box(sink.digest())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_hash_graph, bench_hash_string_paths);
criterion_main!(benches);
