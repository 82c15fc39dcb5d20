//! Replay of recorded landmark streams.
//!
//! A recording is a YAML document listing frames with their timestamps:
//!
//! ```yaml
//! frames:
//!   - timestamp_ms: 0
//!     landmarks:
//!       - { x: 0.5, y: 0.2, z: 0.0, visibility: 0.9 }
//!       # ... 33 landmarks
//! ```
//!
//! Replaying feeds every frame through a [`Session`] exactly as the live
//! capture callback would.

use crate::feedback::FeedbackSink;
use crate::landmarks::Landmark;
use crate::session::{RepReport, Session};
use crate::{Error, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One captured frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Capture time since the start of the recording
    pub timestamp_ms: u64,
    pub landmarks: Vec<Landmark>,
}

/// A recorded landmark stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub frames: Vec<RecordedFrame>,
}

impl Recording {
    /// Load a recording from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid recording
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a recording from YAML text
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if timestamps go backwards
    pub fn from_yaml(content: &str) -> Result<Self> {
        let recording: Self = serde_yaml::from_str(content)?;
        recording.validate()?;
        Ok(recording)
    }

    /// Save the recording as YAML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for pair in self.frames.windows(2) {
            if pair[1].timestamp_ms < pair[0].timestamp_ms {
                return Err(Error::InvalidInput(format!(
                    "Frame timestamps must not decrease: {} after {}",
                    pair[1].timestamp_ms, pair[0].timestamp_ms
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of replaying a recording
#[derive(Debug, Clone, Default)]
pub struct ReplayResult {
    /// Frames handed to the session
    pub frames: usize,
    /// Frames skipped for carrying fewer landmarks than a full pose
    pub dropped: usize,
    pub reports: Vec<RepReport>,
}

/// Feed every usable frame of `recording` through `session`
pub fn replay<S: FeedbackSink>(session: &mut Session<S>, recording: &Recording) -> ReplayResult {
    let mut result = ReplayResult::default();

    for frame in &recording.frames {
        if !crate::landmarks::is_full_pose(&frame.landmarks) {
            result.dropped += 1;
            continue;
        }

        result.frames += 1;
        let outcome = session.process_frame(&frame.landmarks, Duration::from_millis(frame.timestamp_ms));

        if let Some(report) = outcome.report {
            info!(
                "Rep {}: score {} flags {:?} in {:?}",
                report.rep_number,
                report.score(),
                report.flags(),
                report.completion.duration
            );
            result.reports.push(report);
        }
    }

    if result.dropped > 0 {
        warn!("Dropped {} frames without a full-body pose", result.dropped);
    }

    result
}
