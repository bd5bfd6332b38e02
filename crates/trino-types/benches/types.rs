//! Benchmarks for Trino type signature parsing and value decoding.

#![allow(clippy::unwrap_used, missing_docs)]

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;
use trino_types::{DecodeOptions, FromSql, TypeSignature, decode_value};

/// Benchmark signature parsing from simple scalars to deep containers.
fn bench_parse_signature(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_signature");

    for (name, text) in [
        ("scalar", "bigint"),
        ("decimal", "decimal(38,10)"),
        ("timestamp_tz", "timestamp(6) with time zone"),
        ("nested", "array(map(varchar, array(row(x bigint, \"y z\" double))))"),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| TypeSignature::parse(black_box(text)).unwrap())
        });
    }

    group.finish();
}

/// Benchmark decoding a page-sized batch of cells.
fn bench_decode_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_rows");
    let options = DecodeOptions::default();

    let bigint = TypeSignature::BigInt;
    let cells: Vec<Value> = (0..1000).map(|i| json!(i)).collect();
    group.throughput(Throughput::Elements(cells.len() as u64));
    group.bench_function("bigint", |b| {
        b.iter(|| {
            for cell in &cells {
                black_box(decode_value(&bigint, black_box(cell), &options).unwrap());
            }
        })
    });

    let decimal = TypeSignature::parse("decimal(12,2)").unwrap();
    let cells: Vec<Value> = (0..1000).map(|i| json!(format!("{i}.25"))).collect();
    group.bench_function("decimal", |b| {
        b.iter(|| {
            for cell in &cells {
                black_box(decode_value(&decimal, black_box(cell), &options).unwrap());
            }
        })
    });

    let timestamp = TypeSignature::parse("timestamp(3) with time zone").unwrap();
    let cell = json!("2024-05-01 12:34:56.789 Europe/Paris");
    group.bench_function("timestamp_tz", |b| {
        b.iter(|| black_box(decode_value(&timestamp, black_box(&cell), &options).unwrap()))
    });

    group.finish();
}

/// Benchmark decoding and converting nested containers.
fn bench_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested");
    let options = DecodeOptions::default();

    let sig = TypeSignature::parse("array(array(bigint))").unwrap();
    let raw = Value::Array(
        (0..100)
            .map(|i| Value::Array((0..10).map(|j| if j == i % 10 { Value::Null } else { json!(j) }).collect()))
            .collect(),
    );
    group.bench_function("array_array_bigint", |b| {
        b.iter(|| {
            let value = decode_value(&sig, black_box(&raw), &options).unwrap();
            let typed: Vec<Vec<Option<i64>>> = FromSql::from_sql(&value).unwrap();
            black_box(typed)
        })
    });

    let sig = TypeSignature::parse("map(varchar, double)").unwrap();
    let raw = Value::Object((0..100).map(|i| (format!("key{i}"), json!(f64::from(i) / 3.0))).collect());
    group.bench_function("map_varchar_double", |b| {
        b.iter(|| black_box(decode_value(&sig, black_box(&raw), &options).unwrap()))
    });

    let value = decode_value(&sig, &raw, &options).unwrap();
    group.bench_function("map_to_json", |b| b.iter(|| black_box(value.to_json())));

    group.finish();
}

criterion_group!(benches, bench_parse_signature, bench_decode_rows, bench_nested);
criterion_main!(benches);
