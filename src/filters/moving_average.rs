use std::collections::VecDeque;

use super::AngleFilter;
use crate::angles::{AngleKind, JointAngles};

/// Moving average filter
pub struct MovingAverageFilter {
    window_size: usize,
    buffers: [VecDeque<f64>; AngleKind::COUNT],
}

impl MovingAverageFilter {
    /// Create a new moving average filter
    ///
    /// # Panics
    ///
    /// Panics if the window size is zero
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "Window size must be greater than 0");
        Self {
            window_size,
            buffers: std::array::from_fn(|_| VecDeque::with_capacity(window_size)),
        }
    }
}

impl AngleFilter for MovingAverageFilter {
    #[allow(clippy::cast_precision_loss)] // Window sizes are tiny
    fn apply(&mut self, angles: JointAngles) -> JointAngles {
        let mut out = JointAngles::default();

        for kind in AngleKind::ALL {
            let raw = angles.get(kind);
            if JointAngles::is_missing_value(raw) {
                continue;
            }

            let buffer = &mut self.buffers[kind.index()];
            if buffer.len() >= self.window_size {
                buffer.pop_front();
            }
            buffer.push_back(raw);

            out.set(kind, buffer.iter().sum::<f64>() / buffer.len() as f64);
        }

        out
    }

    fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.clear();
        }
    }

    fn name(&self) -> &str {
        "MovingAverageFilter"
    }
}
