//! Joint angle computation from body landmarks.
//!
//! Every angle is measured in the image plane from 2D segment vectors built
//! along the kinematic chain. For the limb joints the acute angle between
//! the two adjacent segments is inverted (`180 - acute`), so a fully
//! extended limb reads about 180 degrees and a fully flexed one reads low.
//! Trunk is the deviation of the hip-to-shoulder segment from vertical.
//!
//! A value of exactly `0.0` means the angle could not be computed for this
//! frame (too few landmarks, or an occluded landmark).

use crate::constants::{
    DEFAULT_SMOOTHING_ALPHA, LEFT_ANKLE, LEFT_ELBOW, LEFT_FOOT_INDEX, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST,
    MAX_JOINT_ANGLE, MAX_TRUNK_ANGLE, MIN_SEGMENT_LENGTH, MISSING_ANGLE,
};
use crate::filters::{exponential::ExponentialFilter, AngleFilter};
use crate::landmarks::{is_full_pose, visible_points, Landmark};
use serde::{Deserialize, Serialize};

/// Identifies one of the six tracked angles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleKind {
    Trunk,
    Hip,
    Knee,
    Shoulder,
    Elbow,
    Ankle,
}

impl AngleKind {
    /// Number of tracked angles
    pub const COUNT: usize = 6;

    /// All angles in storage order
    pub const ALL: [Self; Self::COUNT] = [
        Self::Trunk,
        Self::Hip,
        Self::Knee,
        Self::Shoulder,
        Self::Elbow,
        Self::Ankle,
    ];

    /// Position in [`AngleKind::ALL`]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Trunk => 0,
            Self::Hip => 1,
            Self::Knee => 2,
            Self::Shoulder => 3,
            Self::Elbow => 4,
            Self::Ankle => 5,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Trunk => "trunk",
            Self::Hip => "hip",
            Self::Knee => "knee",
            Self::Shoulder => "shoulder",
            Self::Elbow => "elbow",
            Self::Ankle => "ankle",
        }
    }
}

/// Six joint angles in degrees. `0.0` marks a missing measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointAngles {
    /// Deviation of the torso from vertical, in [0, 90]
    pub trunk: f64,
    pub hip: f64,
    pub knee: f64,
    pub shoulder: f64,
    pub elbow: f64,
    pub ankle: f64,
}

impl JointAngles {
    /// All six angles set to the same value
    #[must_use]
    pub const fn uniform(value: f64) -> Self {
        Self {
            trunk: value,
            hip: value,
            knee: value,
            shoulder: value,
            elbow: value,
            ankle: value,
        }
    }

    #[must_use]
    pub const fn get(&self, kind: AngleKind) -> f64 {
        match kind {
            AngleKind::Trunk => self.trunk,
            AngleKind::Hip => self.hip,
            AngleKind::Knee => self.knee,
            AngleKind::Shoulder => self.shoulder,
            AngleKind::Elbow => self.elbow,
            AngleKind::Ankle => self.ankle,
        }
    }

    pub fn set(&mut self, kind: AngleKind, value: f64) {
        match kind {
            AngleKind::Trunk => self.trunk = value,
            AngleKind::Hip => self.hip = value,
            AngleKind::Knee => self.knee = value,
            AngleKind::Shoulder => self.shoulder = value,
            AngleKind::Elbow => self.elbow = value,
            AngleKind::Ankle => self.ankle = value,
        }
    }

    /// Whether `kind` could not be computed this frame
    #[must_use]
    pub fn is_missing(&self, kind: AngleKind) -> bool {
        Self::is_missing_value(self.get(kind))
    }

    /// The angle, or `None` if it is the missing sentinel
    #[must_use]
    pub fn measured(&self, kind: AngleKind) -> Option<f64> {
        let value = self.get(kind);
        (!Self::is_missing_value(value)).then_some(value)
    }

    /// `true` for the missing sentinel (and for non-finite garbage)
    #[must_use]
    pub fn is_missing_value(value: f64) -> bool {
        !value.is_finite() || value == MISSING_ANGLE
    }
}

/// Per-session angle calculator owning its smoothing memory.
///
/// Construct one per recording session and drop (or [`reset`](Self::reset))
/// it when the session ends; nothing is shared between instances.
pub struct AngleCalculator {
    filter: Box<dyn AngleFilter>,
}

impl AngleCalculator {
    /// Calculator with the default exponential smoothing (0.8 previous, 0.2 new)
    #[must_use]
    pub fn new() -> Self {
        Self::with_filter(Box::new(ExponentialFilter::new(DEFAULT_SMOOTHING_ALPHA)))
    }

    /// Calculator with a custom smoothing filter
    #[must_use]
    pub fn with_filter(filter: Box<dyn AngleFilter>) -> Self {
        Self { filter }
    }

    /// Compute smoothed angles for one frame
    pub fn calculate(&mut self, landmarks: &[Landmark]) -> JointAngles {
        self.filter.apply(raw_angles(landmarks))
    }

    /// Forget all smoothing memory
    pub fn reset(&mut self) {
        self.filter.reset();
    }

    /// Name of the smoothing filter in use
    #[must_use]
    pub fn filter_name(&self) -> &str {
        self.filter.name()
    }
}

impl Default for AngleCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Unsmoothed angles for a single frame
#[must_use]
pub fn raw_angles(landmarks: &[Landmark]) -> JointAngles {
    if !is_full_pose(landmarks) {
        return JointAngles::default();
    }

    let chain = |indices: [usize; 3]| {
        visible_points(landmarks, indices).map_or(MISSING_ANGLE, |[a, b, c]| joint_angle(a, b, c))
    };

    JointAngles {
        trunk: visible_points(landmarks, [LEFT_HIP, LEFT_SHOULDER])
            .map_or(MISSING_ANGLE, |[hip, shoulder]| trunk_angle(hip, shoulder)),
        hip: chain([LEFT_SHOULDER, LEFT_HIP, LEFT_KNEE]),
        knee: chain([LEFT_HIP, LEFT_KNEE, LEFT_ANKLE]),
        shoulder: chain([LEFT_HIP, LEFT_SHOULDER, LEFT_ELBOW]),
        elbow: chain([LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST]),
        ankle: chain([LEFT_KNEE, LEFT_ANKLE, LEFT_FOOT_INDEX]),
    }
}

/// Angle at `joint` for the chain `proximal -> joint -> distal`, 180 when straight
#[must_use]
pub fn joint_angle(proximal: (f64, f64), joint: (f64, f64), distal: (f64, f64)) -> f64 {
    let incoming = segment(proximal, joint);
    let outgoing = segment(joint, distal);

    angle_between(incoming, outgoing)
        .map_or(MISSING_ANGLE, |acute| (MAX_JOINT_ANGLE - acute).clamp(0.0, MAX_JOINT_ANGLE))
}

/// Absolute deviation of `hip -> shoulder` from vertical, in [0, 90]
#[must_use]
pub fn trunk_angle(hip: (f64, f64), shoulder: (f64, f64)) -> f64 {
    let (dx, dy) = segment(hip, shoulder);
    let length = dx.hypot(dy);
    if !is_usable_length(length) {
        return MISSING_ANGLE;
    }

    (dy.abs() / length).clamp(-1.0, 1.0).acos().to_degrees().clamp(0.0, MAX_TRUNK_ANGLE)
}

fn segment(from: (f64, f64), to: (f64, f64)) -> (f64, f64) {
    (to.0 - from.0, to.1 - from.1)
}

/// Angle between two vectors in degrees, `None` if either is degenerate
fn angle_between(a: (f64, f64), b: (f64, f64)) -> Option<f64> {
    let mag_a = a.0.hypot(a.1);
    let mag_b = b.0.hypot(b.1);
    if !is_usable_length(mag_a) || !is_usable_length(mag_b) {
        return None;
    }

    let cos_angle = (a.0.mul_add(b.0, a.1 * b.1) / (mag_a * mag_b)).clamp(-1.0, 1.0);
    let angle = cos_angle.acos().to_degrees();
    angle.is_finite().then(|| angle.clamp(0.0, MAX_JOINT_ANGLE))
}

/// Long enough to carry a direction, and not NaN or infinite
fn is_usable_length(length: f64) -> bool {
    length.is_finite() && length >= MIN_SEGMENT_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_limb() {
        let angle = joint_angle((0.5, 0.2), (0.5, 0.5), (0.5, 0.8));
        assert!((angle - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_right_angle() {
        let angle = joint_angle((0.5, 0.2), (0.5, 0.5), (0.8, 0.5));
        assert!((angle - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_folded_limb_reads_low() {
        let angle = joint_angle((0.5, 0.2), (0.5, 0.5), (0.51, 0.25));
        assert!(angle < 10.0);
    }

    #[test]
    fn test_degenerate_segment_is_missing() {
        assert_eq!(joint_angle((0.5, 0.5), (0.5, 0.5), (0.5, 0.8)), MISSING_ANGLE);
        assert_eq!(trunk_angle((0.5, 0.5), (0.5, 0.5)), MISSING_ANGLE);
    }

    #[test]
    fn test_trunk_angle() {
        // Leaning 45 degrees forward
        let lean = trunk_angle((0.5, 0.6), (0.6, 0.5));
        assert!((lean - 45.0).abs() < 1e-6);

        // Horizontal torso
        let flat = trunk_angle((0.5, 0.5), (0.8, 0.5));
        assert!((flat - 90.0).abs() < 1e-6);

        // Upside down is still within [0, 90]
        let inverted = trunk_angle((0.5, 0.3), (0.52, 0.7));
        assert!((0.0..=90.0).contains(&inverted));
    }

    #[test]
    fn test_short_frame_is_all_missing() {
        let frame = vec![Landmark::new(0.5, 0.5, 0.0, 1.0); 20];
        assert_eq!(raw_angles(&frame), JointAngles::default());
    }

    #[test]
    fn test_joint_angles_accessors() {
        let mut angles = JointAngles::default();
        angles.set(AngleKind::Knee, 95.0);
        assert_eq!(angles.measured(AngleKind::Knee), Some(95.0));
        assert_eq!(angles.measured(AngleKind::Hip), None);
        assert!(angles.is_missing(AngleKind::Elbow));
        assert!(JointAngles::is_missing_value(f64::NAN));
    }
}
