//! Body landmarks as delivered by the pose-estimation provider.
//!
//! A frame is a slice of up to 33 landmarks with fixed anatomical indices
//! (see [`crate::constants`]). This crate only reads frames, it never
//! mutates or stores them.

use crate::constants::{NUM_POSE_LANDMARKS, VISIBILITY_THRESHOLD};
use serde::{Deserialize, Serialize};

/// A single tracked point in normalized image coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position, 0 = left edge, 1 = right edge
    pub x: f32,
    /// Vertical position, 0 = top edge, 1 = bottom edge
    pub y: f32,
    /// Relative depth
    #[serde(default)]
    pub z: f32,
    /// Detection confidence in [0, 1]
    #[serde(default)]
    pub visibility: Option<f32>,
}

impl Landmark {
    /// Create a landmark with the given visibility
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: Some(visibility),
        }
    }

    /// Visible iff visibility is strictly above 0.5. A landmark without a
    /// visibility value is not trusted.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visibility.is_some_and(|v| v > VISIBILITY_THRESHOLD)
    }

    /// Position as a 2D point in f64
    #[must_use]
    pub fn point(&self) -> (f64, f64) {
        (f64::from(self.x), f64::from(self.y))
    }
}

/// Whether a frame carries the full 33-point body skeleton
#[must_use]
pub fn is_full_pose(landmarks: &[Landmark]) -> bool {
    landmarks.len() >= NUM_POSE_LANDMARKS
}

/// Landmark at `index` if it exists and is visible
#[must_use]
pub fn visible(landmarks: &[Landmark], index: usize) -> Option<&Landmark> {
    landmarks.get(index).filter(|lm| lm.is_visible())
}

/// Positions of all requested landmarks, or `None` if any is missing or occluded
#[must_use]
pub fn visible_points<const N: usize>(landmarks: &[Landmark], indices: [usize; N]) -> Option<[(f64, f64); N]> {
    let mut points = [(0.0, 0.0); N];
    for (slot, &index) in points.iter_mut().zip(indices.iter()) {
        *slot = visible(landmarks, index)?.point();
    }
    Some(points)
}
