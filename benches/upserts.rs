//! Criterion comparison of the bulk UPSERT strategies.
//!
//! Each sample reseeds a temporary SQLite file with the even ids below
//! `UPSERT_N` and then upserts ids `0..UPSERT_N`.
//!
//! Run:    `cargo bench --bench upserts`
//! Filter: `cargo bench --bench upserts -- merge_result`

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use tempfile::TempDir;
use upsert_benchmarks::registry::SetupArgs;
use upsert_benchmarks::suites::bulk_upserts::{self, UpsertContext};

const UPSERT_N: u64 = 2_000;

fn upsert_strategies(c: &mut Criterion) {
    let suite = bulk_upserts::suite().unwrap();
    let dir = TempDir::new().unwrap();
    let dburl = format!("sqlite:///{}", dir.path().join("bench.db").display());
    let setup = suite.setup().expect("bulk_upserts registers a setup hook");

    let mut group = c.benchmark_group("bulk_upserts");
    group.throughput(Throughput::Elements(UPSERT_N));
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    for test in suite.tests() {
        let label = test.name.trim_start_matches("test_customer_");
        group.bench_function(label, |b| {
            b.iter_batched(
                || {
                    let mut ctx = UpsertContext::default();
                    let args = SetupArgs {
                        dburl: &dburl,
                        echo: false,
                        num: UPSERT_N,
                    };
                    (setup.func)(&mut ctx, &args).unwrap();
                    ctx
                },
                |mut ctx| (test.func)(&mut ctx, UPSERT_N).unwrap(),
                BatchSize::PerIteration,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, upsert_strategies);
criterion_main!(benches);
