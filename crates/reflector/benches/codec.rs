// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec Benchmark
//!
//! Measures text and binary encode/decode of a sequence of small records
//! with different element counts, plus handle navigation by field name.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_precision_loss)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reflector::codec::{
    declare_vec, from_binary, from_text, register_common_types, to_binary, to_text,
};
use reflector::{Ref, RefMut, Reflect, Registry};
use std::hint::black_box as bb;

/// Simple benchmark record
#[derive(Debug, Clone, Default, Reflect)]
struct Sample {
    seq: u64,
    level: i32,
    ratio: f64,
    label: String,
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    register_common_types(&mut registry);
    registry.register::<Sample>();
    declare_vec::<Sample>(&mut registry, "Vec<Sample>");
    registry
}

fn samples(count: usize) -> Vec<Sample> {
    (0..count)
        .map(|i| Sample {
            seq: i as u64,
            level: -(i as i32),
            ratio: i as f64 * 0.5,
            label: format!("sample-{}", i),
        })
        .collect()
}

/// Benchmark binary encode and decode by element count
fn bench_binary(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("binary");

    for count in [1, 16, 256, 4096] {
        let data = samples(count);
        let bytes = to_binary(Ref::new(&registry, &data).expect("handle")).expect("encode");
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", count), &data, |b, data| {
            b.iter(|| {
                let r = Ref::new(&registry, data).expect("handle");
                bb(to_binary(r).expect("encode"))
            });
        });

        group.bench_with_input(BenchmarkId::new("decode", count), &bytes, |b, bytes| {
            let mut out = Vec::<Sample>::new();
            b.iter(|| {
                let r = RefMut::new(&registry, &mut out).expect("handle");
                from_binary(bb(bytes), r).expect("decode");
            });
        });
    }

    group.finish();
}

/// Benchmark text encode and decode by element count
fn bench_text(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("text");

    for count in [1, 16, 256] {
        let data = samples(count);
        let tree = to_text(Ref::new(&registry, &data).expect("handle")).expect("encode");

        group.bench_with_input(BenchmarkId::new("encode", count), &data, |b, data| {
            b.iter(|| {
                let r = Ref::new(&registry, data).expect("handle");
                bb(to_text(r).expect("encode"))
            });
        });

        group.bench_with_input(BenchmarkId::new("decode", count), &tree, |b, tree| {
            let mut out = Vec::<Sample>::new();
            b.iter(|| {
                let r = RefMut::new(&registry, &mut out).expect("handle");
                from_text(bb(tree), r).expect("decode");
            });
        });
    }

    group.finish();
}

/// Benchmark field lookup by name through a handle
fn bench_field_lookup(c: &mut Criterion) {
    let registry = registry();
    let sample = samples(1).remove(0);

    c.bench_function("handle_get_by_name", |b| {
        let r = Ref::new(&registry, &sample).expect("handle");
        b.iter(|| bb(r.get(bb("label")).expect("field")));
    });
}

criterion_group!(benches, bench_binary, bench_text, bench_field_lookup);
criterion_main!(benches);
