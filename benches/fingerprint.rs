//! Benchmarks for call fingerprinting
//!
//! This benchmark measures:
//! - Canonical parameter rendering (argument lists vs. key-sorted objects)
//! - SHA-256 digest of the rendered string
//! - Custom stringifier overhead

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use task_manager_core::fingerprint::{digest, params_string, Fingerprinter};

#[derive(Serialize)]
struct Query {
    user_id: u64,
    page: u32,
    per_page: u32,
    filter: String,
    tags: Vec<String>,
}

fn sample_query() -> Query {
    Query {
        user_id: 42,
        page: 3,
        per_page: 50,
        filter: "status:open".to_string(),
        tags: vec!["backend".into(), "urgent".into(), "billing".into()],
    }
}

fn bench_params_string(c: &mut Criterion) {
    let mut group = c.benchmark_group("params_string");

    group.bench_function("argument_list", |b| {
        b.iter(|| params_string(black_box(&(42u64, "status:open", 3u32))))
    });

    let query = (sample_query(),);
    group.bench_function("single_object", |b| b.iter(|| params_string(black_box(&query))));

    for size in [8usize, 64, 512] {
        let map: HashMap<String, u64> = (0..size as u64).map(|i| (format!("key_{:04}", i), i)).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("map", size), &map, |b, map| {
            b.iter(|| params_string(black_box(map)))
        });
    }

    group.finish();
}

fn bench_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash");

    let default = Fingerprinter::<(Query,)>::new();
    let query = (sample_query(),);
    group.bench_function("default", |b| b.iter(|| default.hash(black_box(&query))));

    let custom = Fingerprinter::<(Query,)>::with_stringifier(Arc::new(|(q,)| {
        format!("{}:{}:{}", q.user_id, q.page, q.filter)
    }));
    group.bench_function("custom_stringifier", |b| b.iter(|| custom.hash(black_box(&query))));

    for len in [16usize, 1024, 16 * 1024] {
        let input = "x".repeat(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("digest", len), &input, |b, input| {
            b.iter(|| digest(black_box(input)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_params_string, bench_hash);
criterion_main!(benches);
