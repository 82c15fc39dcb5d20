use super::AngleFilter;
use crate::angles::{AngleKind, JointAngles};

/// Exponential smoothing filter.
///
/// `alpha` is the weight of the new raw value; the previous smoothed value
/// gets `1 - alpha`. The first value seen for an angle passes through.
pub struct ExponentialFilter {
    alpha: f64,
    last: [Option<f64>; AngleKind::COUNT],
}

impl ExponentialFilter {
    /// Create a new exponential filter
    ///
    /// # Panics
    ///
    /// Panics if alpha is not in the range (0, 1]
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        Self {
            alpha,
            last: [None; AngleKind::COUNT],
        }
    }

    /// Weight given to the new raw value
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl AngleFilter for ExponentialFilter {
    fn apply(&mut self, angles: JointAngles) -> JointAngles {
        let mut out = JointAngles::default();

        for kind in AngleKind::ALL {
            let raw = angles.get(kind);
            if JointAngles::is_missing_value(raw) {
                continue;
            }

            let slot = &mut self.last[kind.index()];
            let filtered = match *slot {
                Some(last) => self.alpha.mul_add(raw - last, last),
                None => raw,
            };
            *slot = Some(filtered);
            out.set(kind, filtered);
        }

        out
    }

    fn reset(&mut self) {
        self.last = [None; AngleKind::COUNT];
    }

    fn name(&self) -> &str {
        "ExponentialFilter"
    }
}
