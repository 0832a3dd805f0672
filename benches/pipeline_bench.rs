//! Benchmarks for resampling and lag correlation
//!
//! Run with: cargo bench

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use wildfire_aqi::series::iso_week_monday;
use wildfire_aqi::*;

fn create_weekly(region: Region, years: i32) -> WeeklySeries {
    let mut weekly = WeeklySeries::new(region);
    for year in 2010..2010 + years {
        for week in 1..=52 {
            if let Some(monday) = iso_week_monday(year, week) {
                weekly.add(monday, (week as u64 * 7 + year as u64) % 40);
            }
        }
    }
    weekly
}

fn create_daily(days: i64) -> DailySeries {
    let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
    (0..days)
        .map(|i| (start + chrono::Duration::days(i), 30.0 + (i % 17) as f64))
        .collect()
}

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");

    for years in [1, 12] {
        let weekly = create_weekly(Region::Ontario, years);
        group.throughput(Throughput::Elements(weekly.len() as u64));
        group.bench_function(format!("weekly_sum_{}y", years), |b| {
            b.iter(|| Resampler::resample_weekly(black_box(&weekly)))
        });
    }

    let daily = create_daily(365 * 12);
    group.throughput(Throughput::Elements(daily.len() as u64));
    group.bench_function("daily_mean_12y", |b| {
        b.iter(|| Resampler::mean().resample(black_box(&daily)))
    });

    group.finish();
}

fn bench_correlation(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation");

    let regional: Vec<RegionalMonthly> = Region::all()
        .iter()
        .map(|r| Resampler::resample_weekly(&create_weekly(*r, 12)))
        .collect();
    let statewide = Resampler::mean().resample(&create_daily(365 * 12));
    let merger = SeriesMerger;
    let union = merger.union_regions(&regional);
    let merged = merger.merge_with_aqi(&union, &statewide).unwrap();

    group.bench_function("merge_12y", |b| {
        b.iter(|| merger.merge_with_aqi(black_box(&union), black_box(&statewide)).unwrap())
    });

    for max_lag in [6, 24] {
        let engine = LagCorrelationEngine::new(max_lag);
        group.bench_function(format!("lags_0_{}", max_lag), |b| {
            b.iter(|| engine.compute(black_box(&merged)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resample, bench_correlation);
criterion_main!(benches);
