use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strava_dashboard::models::compute_streak;
use strava_dashboard::services::route_geometry;

/// Ten years of activity days with a rest day every ninth day.
fn activity_days() -> (Vec<NaiveDate>, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).expect("valid date");
    let days: Vec<NaiveDate> = (0..3650)
        .filter(|i| i % 9 != 8)
        .map(|i| start + Duration::days(i))
        .collect();
    let today = *days.last().expect("non-empty");
    (days, today)
}

fn benchmark_streaks(c: &mut Criterion) {
    let (days, today) = activity_days();

    let mut group = c.benchmark_group("streaks");

    group.bench_function("ten_years_current", |b| {
        b.iter(|| compute_streak(black_box(&days), black_box(today)))
    });

    group.bench_function("ten_years_lapsed", |b| {
        let later = today + Duration::days(30);
        b.iter(|| compute_streak(black_box(&days), black_box(later)))
    });

    group.finish();
}

fn benchmark_route_geometry(c: &mut Criterion) {
    // Long synthetic route: a spiral encoded once up front.
    let coords: Vec<geo::Coord<f64>> = (0..2000)
        .map(|i| {
            let t = i as f64 / 50.0;
            geo::coord! { x: -122.1 + t.cos() * t / 400.0, y: 37.4 + t.sin() * t / 400.0 }
        })
        .collect();
    let encoded = polyline::encode_coordinates(coords, 5).expect("encodable route");

    c.bench_function("route_geometry_2000_points", |b| {
        b.iter(|| route_geometry(black_box(&encoded)))
    });
}

criterion_group!(benches, benchmark_streaks, benchmark_route_geometry);
criterion_main!(benches);
