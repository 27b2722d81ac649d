//! Key benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gridlink_bench::generate_keys;
use gridlink_codec::{flatten, unflatten, Value};
use gridlink_core::EntityKey;
use std::collections::HashMap;

/// Benchmark flattening composite keys.
fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");

    for segments in [1usize, 4, 16] {
        let values: Vec<Value> = (0..segments)
            .map(|i| {
                if i % 2 == 0 {
                    Value::Text(format!("segment_{i}"))
                } else {
                    Value::Integer(i as i64)
                }
            })
            .collect();
        group.throughput(Throughput::Elements(segments as u64));
        group.bench_with_input(BenchmarkId::new("flatten", segments), &values, |b, values| {
            b.iter(|| black_box(flatten(black_box(values)).unwrap()));
        });

        let flat = flatten(&values).unwrap();
        group.bench_with_input(BenchmarkId::new("unflatten", segments), &flat, |b, flat| {
            b.iter(|| black_box(unflatten(black_box(flat)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark keys used as hash map keys.
fn bench_key_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_lookup");

    for count in [100usize, 10_000] {
        let keys = generate_keys("users", count);
        let map: HashMap<EntityKey, usize> = keys.iter().cloned().zip(0..).collect();
        group.bench_with_input(BenchmarkId::new("hit", count), &keys, |b, keys| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % keys.len();
                black_box(map.get(&keys[i]));
            });
        });
    }

    group.bench_function("construct", |b| {
        b.iter(|| black_box(EntityKey::single("users", "id", black_box(42))));
    });

    group.finish();
}

criterion_group!(benches, bench_flatten, bench_key_lookup);
criterion_main!(benches);
