//! Temporal smoothing for joint angles.
//!
//! Landmark jitter makes raw per-frame angles noisy. Each filter here keeps
//! an independent memory per angle and treats the `0.0` "missing" sentinel
//! as a gap: missing inputs are reported as missing and never blended.

/// Exponential filter, the default session smoother
pub mod exponential;

/// Moving average filter over a fixed window of frames
pub mod moving_average;

use crate::angles::JointAngles;
use crate::constants::DEFAULT_SMOOTHING_ALPHA;
use crate::{Error, Result};

/// Trait for all angle filters
pub trait AngleFilter: Send + Sync {
    /// Apply filter to one frame of raw angles
    fn apply(&mut self, angles: JointAngles) -> JointAngles;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes through values unchanged
pub struct NoFilter;

impl AngleFilter for NoFilter {
    fn apply(&mut self, angles: JointAngles) -> JointAngles {
        angles
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Create an angle filter from a spec string.
///
/// Accepted forms: `none`, `exponential`, `exponential:<alpha>`,
/// `movingaverage:<window>` (also `moving_average`).
///
/// # Errors
///
/// Returns [`Error::FilterError`] for unknown names or out-of-range parameters.
pub fn create_filter(spec: &str) -> Result<Box<dyn AngleFilter>> {
    let lowered = spec.trim().to_lowercase();
    let mut parts = lowered.split(':');
    let name = parts.next().unwrap_or_default();
    let param = parts.next();

    if parts.next().is_some() {
        return Err(Error::FilterError(format!("Too many parameters in filter spec: {spec}")));
    }

    match name {
        "none" | "nofilter" => Ok(Box::new(NoFilter)),
        "exponential" => {
            let alpha = match param {
                Some(raw) => parse_param::<f64>(raw, spec)?,
                None => DEFAULT_SMOOTHING_ALPHA,
            };
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(Error::FilterError(format!("Alpha must be in (0, 1], got {alpha}")));
            }
            Ok(Box::new(exponential::ExponentialFilter::new(alpha)))
        }
        "movingaverage" | "moving_average" => {
            let window = match param {
                Some(raw) => parse_param::<usize>(raw, spec)?,
                None => 5,
            };
            if window == 0 {
                return Err(Error::FilterError("Window size must be greater than 0".to_string()));
            }
            Ok(Box::new(moving_average::MovingAverageFilter::new(window)))
        }
        _ => Err(Error::FilterError(format!("Unknown filter type: {spec}"))),
    }
}

fn parse_param<T: std::str::FromStr>(raw: &str, spec: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| Error::FilterError(format!("Invalid parameter '{raw}' in filter spec: {spec}")))
}
