//! Helper functions and utilities for tests
#![allow(dead_code)]

use form_coach::{
    angles::JointAngles,
    constants::{
        LEFT_ANKLE, LEFT_ELBOW, LEFT_FOOT_INDEX, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST, NOSE,
        NUM_POSE_LANDMARKS, RIGHT_ANKLE, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER,
    },
    landmarks::Landmark,
    rep_detector::{RepDetection, RepDetector},
};
use std::time::Duration;

/// Segment length used by the synthetic poses
const SEGMENT: f32 = 0.15;

/// Upper arm and forearm length of the pull-up pose
const ARM: f32 = 0.12;

/// Milliseconds as a `Duration`
pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// A full frame with every landmark visible at the image center
pub fn blank_pose() -> Vec<Landmark> {
    vec![Landmark::new(0.5, 0.5, 0.0, 0.9); NUM_POSE_LANDMARKS]
}

/// Set one landmark's position, keeping it visible
pub fn place(frame: &mut [Landmark], index: usize, x: f32, y: f32) {
    frame[index] = Landmark::new(x, y, 0.0, 0.9);
}

/// Side-view squat pose with the thighs rotated `flexion` degrees forward
/// from vertical. Shins stay vertical, so hip and knee read roughly
/// `180 - flexion`. The torso leans slightly so trunk is never exactly 0.
pub fn squat_pose(flexion: f32) -> Vec<Landmark> {
    let mut frame = blank_pose();
    let (sin, cos) = flexion.to_radians().sin_cos();

    for (hip, knee, ankle, shoulder, offset) in [
        (LEFT_HIP, LEFT_KNEE, LEFT_ANKLE, LEFT_SHOULDER, 0.05),
        (RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE, RIGHT_SHOULDER, -0.05),
    ] {
        let hip_x = 0.4 + offset;
        let knee_x = SEGMENT.mul_add(sin, hip_x);
        let knee_y = SEGMENT.mul_add(cos, 0.5);
        place(&mut frame, hip, hip_x, 0.5);
        place(&mut frame, knee, knee_x, knee_y);
        place(&mut frame, ankle, knee_x, knee_y + SEGMENT);
        place(&mut frame, shoulder, hip_x + 0.02, 0.3);
    }

    let left_ankle = frame[LEFT_ANKLE];
    place(&mut frame, LEFT_FOOT_INDEX, left_ankle.x + 0.08, left_ankle.y);
    place(&mut frame, NOSE, 0.42, 0.2);
    frame
}

/// Squat pose with the right knee caved in next to the left one
pub fn valgus_squat_pose(flexion: f32) -> Vec<Landmark> {
    let mut frame = squat_pose(flexion);
    let left_knee = frame[LEFT_KNEE];
    place(&mut frame, RIGHT_KNEE, left_knee.x - 0.01, left_knee.y);
    frame
}

/// Front-view pull-up pose hanging from a bar at y = 0.1. `pull` in [0, 1]
/// bends the left elbow from straight (0, about 180) to 60 degrees (1), which
/// lifts the shoulders from 0.34 to 0.22. The nose starts 0.1 below the
/// shoulder line and ends 0.05 above it. Hips stay centered under the bar.
pub fn pull_up_pose(pull: f32) -> Vec<Landmark> {
    let mut frame = blank_pose();
    let half_bend = (180.0 - 120.0 * pull).to_radians() / 2.0;
    let (sin, cos) = half_bend.sin_cos();
    let reach = 2.0 * ARM * sin;
    let shoulder_y = 0.1 + reach;

    place(&mut frame, LEFT_WRIST, 0.6, 0.1);
    place(&mut frame, LEFT_ELBOW, ARM.mul_add(cos, 0.6), reach.mul_add(0.5, 0.1));
    place(&mut frame, LEFT_SHOULDER, 0.6, shoulder_y);
    place(&mut frame, RIGHT_SHOULDER, 0.4, shoulder_y);
    place(&mut frame, NOSE, 0.5, 0.15f32.mul_add(1.0 - pull, shoulder_y - 0.05));
    place(&mut frame, LEFT_HIP, 0.55, shoulder_y + 0.3);
    place(&mut frame, RIGHT_HIP, 0.45, shoulder_y + 0.3);
    place(&mut frame, LEFT_KNEE, 0.55, shoulder_y + 0.45);
    place(&mut frame, LEFT_ANKLE, 0.55, shoulder_y + 0.6);
    frame
}

/// Angles with only hip and knee set, as a squat detector sees them
pub fn squat_angles(hip: f64, knee: f64) -> JointAngles {
    JointAngles {
        hip,
        knee,
        ..JointAngles::default()
    }
}

/// Calibrate a squat detector: 15 standing frames at 170/175 then 10 frames
/// at 70/80 depth, 100ms apart. Returns the timestamp of the next frame.
pub fn calibrate_squat(detector: &mut RepDetector) -> u64 {
    let mut t = 0;
    for _ in 0..15 {
        detector.update(&squat_angles(170.0, 175.0), ms(t));
        t += 100;
    }
    for _ in 0..10 {
        detector.update(&squat_angles(70.0, 80.0), ms(t));
        t += 100;
    }
    t
}

/// Feed `(timestamp_ms, hip, knee)` frames and collect the detections
pub fn feed(detector: &mut RepDetector, frames: &[(u64, f64, f64)]) -> Vec<RepDetection> {
    frames
        .iter()
        .map(|&(t, hip, knee)| detector.update(&squat_angles(hip, knee), ms(t)))
        .collect()
}

/// Linear ramp of the hip angle from `from` to `to` over `steps` frames spaced
/// `step_ms` apart starting at `start_ms`, with knee = hip + 5
pub fn ramp(start_ms: u64, step_ms: u64, steps: u64, from: f64, to: f64) -> Vec<(u64, f64, f64)> {
    (1..=steps)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let hip = from + (to - from) * (i as f64 / steps as f64);
            (start_ms + i * step_ms, hip, hip + 5.0)
        })
        .collect()
}
