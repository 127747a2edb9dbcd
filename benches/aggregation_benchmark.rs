use carbon_tracker::models::{EmissionFactors, RecordedEmission};
use carbon_tracker::services::{
    calculate_total_emissions, daily_trends, EmissionCalculator, PeriodWindow,
};
use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// A year of activity: every table entry logged once a day.
fn year_of_records(calculator: &EmissionCalculator) -> Vec<RecordedEmission> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let mut records = Vec::new();
    for day in 0..365 {
        for (category, types) in calculator.all_activity_types() {
            for info in types {
                let value = 1.0 + (day % 7) as f64;
                let emission = calculator
                    .calculate_emission(category.as_str(), &info.activity_type, value, &info.unit)
                    .expect("table entry must calculate");
                records.push(RecordedEmission {
                    category,
                    activity_type: info.activity_type,
                    co2_emission: emission.co2_emission,
                    date: start + Duration::days(day),
                });
            }
        }
    }
    records
}

fn benchmark_aggregation(c: &mut Criterion) {
    let calculator = EmissionCalculator::new(EmissionFactors::builtin());
    let records = year_of_records(&calculator);
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let window = PeriodWindow::trailing_days(365, now);

    let mut group = c.benchmark_group("aggregation");

    group.bench_function("calculate_emission", |b| {
        b.iter(|| {
            calculator.calculate_emission(
                black_box("transport"),
                black_box("flight_long"),
                black_box(1234.5),
                "km",
            )
        })
    });

    group.bench_function("summary_one_year", |b| {
        b.iter(|| calculate_total_emissions(black_box(&records)))
    });

    group.bench_function("daily_trends_one_year", |b| {
        b.iter(|| daily_trends(black_box(&records), &window))
    });

    group.finish();
}

criterion_group!(benches, benchmark_aggregation);
criterion_main!(benches);
