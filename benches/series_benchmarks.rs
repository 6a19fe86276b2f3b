//! Performance benchmarks for grouped vs per-bucket time series

use chrono::{Duration, NaiveDate, NaiveDateTime};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use qstats::{MemoryCollection, Record, SeriesRequest, Stats};
use std::hint::black_box;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Create records spread over one year, one every `step_minutes`
fn create_records(count: usize, step_minutes: i64) -> MemoryCollection {
    MemoryCollection::new((0..count).map(|i| {
        Record::new()
            .with("id", i as i64)
            .with("created", start() + Duration::minutes(i as i64 * step_minutes))
    }))
}

fn bench_daily_series(c: &mut Criterion) {
    let mut group = c.benchmark_group("daily_series");

    for size in [1_000usize, 10_000].iter() {
        let stats = Stats::new(create_records(*size, 50)).with_date_field("created");
        let request = SeriesRequest::new(start()).end(start() + Duration::days(365));

        group.bench_with_input(BenchmarkId::new("grouped", size), size, |b, _| {
            b.iter(|| black_box(stats.time_series(&request).unwrap()));
        });

        let per_bucket = request.clone().engine("none");
        group.bench_with_input(BenchmarkId::new("per_bucket", size), size, |b, _| {
            b.iter(|| black_box(stats.time_series(&per_bucket).unwrap()));
        });
    }

    group.finish();
}

fn bench_bounds(c: &mut Criterion) {
    c.bench_function("week_bounds", |b| {
        b.iter(|| black_box(qstats::bounds(black_box(start()), qstats::IntervalKind::Week)));
    });
}

criterion_group!(benches, bench_daily_series, bench_bounds);
criterion_main!(benches);
