//! Track interpolation benchmarks using Criterion.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use annotrack::{BoundingBox, Track};

/// Create a track with `n` keyframes of steady rightward motion.
fn create_test_track(n: usize) -> Track {
    let keyframes: Vec<i64> = (0..n).map(|k| (k * 10) as i64).collect();
    let boxes: Vec<BoundingBox> = (0..n)
        .map(|k| {
            let x = (k * 25) as f64;
            BoundingBox::from_xywh(x, 100.0, 50.0, 50.0)
        })
        .collect();
    Track::new("person", keyframes, boxes).expect("valid track")
}

fn benchmark_interpolate_10_keyframes(c: &mut Criterion) {
    let track = create_test_track(10);
    let mid = (track.startframe() + track.endframe()) / 2;

    c.bench_function("interpolate_10_keyframes", |b| {
        b.iter(|| track.interpolate(black_box(mid)))
    });
}

fn benchmark_interpolate_500_keyframes(c: &mut Criterion) {
    let track = create_test_track(500);
    let mid = (track.startframe() + track.endframe()) / 2;

    c.bench_function("interpolate_500_keyframes", |b| {
        b.iter(|| track.interpolate(black_box(mid)))
    });
}

fn benchmark_iterate_full_span(c: &mut Criterion) {
    let track = create_test_track(100);

    c.bench_function("iterate_full_span_100_keyframes", |b| {
        b.iter(|| black_box(&track).iter().count())
    });
}

fn benchmark_add_keyframes(c: &mut Criterion) {
    c.bench_function("add_500_keyframes", |b| {
        b.iter(|| {
            let mut track = Track::new(
                "person",
                vec![0],
                vec![BoundingBox::from_xywh(0.0, 0.0, 10.0, 10.0)],
            )
            .unwrap();
            for k in 1..500i64 {
                track
                    .add(k, BoundingBox::from_xywh(k as f64, 0.0, 10.0, 10.0))
                    .unwrap();
            }
            track
        })
    });
}

criterion_group!(
    benches,
    benchmark_interpolate_10_keyframes,
    benchmark_interpolate_500_keyframes,
    benchmark_iterate_full_span,
    benchmark_add_keyframes
);
criterion_main!(benches);
