//! Benchmarks for the repetition detector

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use form_coach::{
    angles::JointAngles,
    rep_detector::RepDetector,
    rules::Exercise,
};
use std::time::Duration;

/// Squat-like hip and knee angles sampled at 30 fps, with noise
fn squat_cycle(frames: usize) -> Vec<JointAngles> {
    (0..frames)
        .map(|i| {
            let t = i as f64 / 30.0;
            let hip = 120.0 + 50.0 * (t * 2.0).cos() + rand::random::<f64>();
            JointAngles {
                hip,
                knee: hip + 5.0,
                ..JointAngles::default()
            }
        })
        .collect()
}

fn benchmark_detector(c: &mut Criterion) {
    let mut group = c.benchmark_group("rep_detector");

    for frames in [300, 3_000] {
        let data = squat_cycle(frames);
        group.bench_with_input(BenchmarkId::new("update", frames), &data, |b, data| {
            b.iter(|| {
                let mut detector = RepDetector::new(Exercise::Squat);
                for (i, angles) in data.iter().enumerate() {
                    let timestamp = Duration::from_millis(i as u64 * 33);
                    black_box(detector.update(black_box(angles), timestamp));
                }
                detector.rep_count()
            });
        });
    }

    group.finish();
}

fn benchmark_throttled(c: &mut Criterion) {
    let data = squat_cycle(1);
    let mut detector = RepDetector::new(Exercise::Squat);
    detector.update(&data[0], Duration::ZERO);

    // Every call lands inside the throttle window
    c.bench_function("rep_detector_throttled", |b| {
        b.iter(|| black_box(detector.update(black_box(&data[0]), Duration::from_millis(10))));
    });
}

criterion_group!(benches, benchmark_detector, benchmark_throttled);
criterion_main!(benches);
