use std::sync::Arc;

use arrow::array::StringArray;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use term_profile::patterns::{signature, strict_signature, PATTERN_SIGNATURE_FUNCTION};
use term_profile::prelude::*;
use tokio::runtime::Runtime;

fn sample_values(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| match i % 4 {
            0 => format!("555-{i:04}"),
            1 => format!("AB{i}cd"),
            2 => format!("user{i}@example.com"),
            _ => format!("Straße {i}"),
        })
        .collect()
}

fn benchmark_signature(c: &mut Criterion) {
    let mut group = c.benchmark_group("signature");

    for n in [1_000, 10_000, 100_000].iter() {
        let values = sample_values(*n);
        group.throughput(Throughput::Elements(*n as u64));

        group.bench_with_input(BenchmarkId::new("stored", n), &values, |b, values| {
            b.iter(|| {
                values
                    .iter()
                    .map(|v| signature(std::hint::black_box(v)))
                    .collect::<Vec<_>>()
            });
        });

        group.bench_with_input(BenchmarkId::new("strict", n), &values, |b, values| {
            b.iter(|| {
                values
                    .iter()
                    .map(|v| strict_signature(std::hint::black_box(v)))
                    .collect::<Vec<_>>()
            });
        });
    }

    group.finish();
}

fn benchmark_signature_udf(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("signature_udf");

    for n in [10_000, 100_000].iter() {
        let values = sample_values(*n);
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Utf8, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from_iter_values(values))],
        )
        .unwrap();

        let ctx = ProfilerConfig::default().session_context();
        ctx.register_batch("samples", batch).unwrap();
        let sql = format!("SELECT COUNT(DISTINCT {PATTERN_SIGNATURE_FUNCTION}(v)) FROM samples");

        group.throughput(Throughput::Elements(*n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| {
                rt.block_on(async { ctx.sql(sql).await.unwrap().collect().await.unwrap() })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_signature, benchmark_signature_udf);
criterion_main!(benches);
