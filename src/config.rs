//! Configuration management for the form analysis pipeline

use crate::constants::{
    CALIBRATION_FRAMES, CONFIDENCE_FRAMES, DEBOUNCE_MS, DEFAULT_DEPTH_FLOOR, DEFAULT_DEPTH_OFFSET,
    DEFAULT_SMOOTHING_ALPHA, DEPTH_CHANGE_THRESHOLD, DEPTH_SMOOTHING, MAX_REP_DURATION_MS, MIN_REP_DURATION_MS,
    RETURN_MARGIN, SECONDARY_MARGIN, STANDING_SAMPLE_FRAMES, STUCK_PHASE_MS, TEMPO_HISTORY, THRESHOLD_RANGE_FRACTION,
    THROTTLE_MS,
};
use crate::rules::Exercise;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Angle smoothing configuration
    pub smoothing: SmoothingConfig,

    /// Rep detector tuning
    pub detector: DetectorConfig,

    /// Session behavior
    pub session: SessionConfig,
}

/// Angle smoothing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Filter type: `exponential`, `moving_average` or `none`
    pub filter: String,

    /// Exponential filter weight of the new raw value
    pub exponential_alpha: f64,

    /// Moving average window size
    pub moving_average_window: usize,
}

/// Rep detector tuning. Defaults are the empirically tuned values; change
/// them only with recorded sessions to check against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Frames accumulated before detection starts
    pub calibration_frames: u32,

    /// Leading calibration frames averaged as the standing baseline
    pub standing_sample_frames: u32,

    /// Angle change from standing that counts as a depth observation, degrees
    pub depth_change_threshold: f64,

    /// Weight of the previous depth estimate when a new observation arrives
    pub depth_smoothing: f64,

    /// Lowest default depth when calibration saw no movement, degrees
    pub default_depth_floor: f64,

    /// Default depth below standing when calibration saw no movement, degrees
    pub default_depth_offset: f64,

    /// Fraction of the standing-to-depth range used for the thresholds
    pub threshold_range_fraction: f64,

    /// Extra primary-angle margin needed to abandon a started rep, degrees
    pub return_margin: f64,

    /// Secondary-angle margin below standing, degrees
    pub secondary_margin: f64,

    /// Minimum time between two phase transitions, milliseconds
    pub debounce_ms: u64,

    /// Frames closer together than this are not reprocessed, milliseconds
    pub throttle_ms: u64,

    /// Time without a transition before a completion is forced, milliseconds
    pub stuck_phase_ms: u64,

    /// Shortest rep that counts, milliseconds
    pub min_rep_duration_ms: u64,

    /// Longest rep that counts, milliseconds
    pub max_rep_duration_ms: u64,

    /// Frames in one phase before confidence reaches 1.0
    pub confidence_frames: u32,

    /// Number of rep durations kept for tempo statistics
    pub tempo_history: usize,
}

/// Session behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Exercise analyzed by default
    pub exercise: Exercise,

    /// Produce voice cues for the owner to speak
    pub voice_enabled: bool,

    /// Suppress the session summary sent to the text-generation endpoint
    pub privacy_mode: bool,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            filter: "exponential".to_string(),
            exponential_alpha: DEFAULT_SMOOTHING_ALPHA,
            moving_average_window: 5,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            calibration_frames: CALIBRATION_FRAMES,
            standing_sample_frames: STANDING_SAMPLE_FRAMES,
            depth_change_threshold: DEPTH_CHANGE_THRESHOLD,
            depth_smoothing: DEPTH_SMOOTHING,
            default_depth_floor: DEFAULT_DEPTH_FLOOR,
            default_depth_offset: DEFAULT_DEPTH_OFFSET,
            threshold_range_fraction: THRESHOLD_RANGE_FRACTION,
            return_margin: RETURN_MARGIN,
            secondary_margin: SECONDARY_MARGIN,
            debounce_ms: DEBOUNCE_MS,
            throttle_ms: THROTTLE_MS,
            stuck_phase_ms: STUCK_PHASE_MS,
            min_rep_duration_ms: MIN_REP_DURATION_MS,
            max_rep_duration_ms: MAX_REP_DURATION_MS,
            confidence_frames: CONFIDENCE_FRAMES,
            tempo_history: TEMPO_HISTORY,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exercise: Exercise::Squat,
            voice_enabled: false,
            privacy_mode: false,
        }
    }
}

impl DetectorConfig {
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub const fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    #[must_use]
    pub const fn stuck_phase(&self) -> Duration {
        Duration::from_millis(self.stuck_phase_ms)
    }

    #[must_use]
    pub const fn min_rep_duration(&self) -> Duration {
        Duration::from_millis(self.min_rep_duration_ms)
    }

    #[must_use]
    pub const fn max_rep_duration(&self) -> Duration {
        Duration::from_millis(self.max_rep_duration_ms)
    }

    /// Validate detector parameters
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.calibration_frames == 0 {
            return Err(Error::ConfigError("Calibration frames must be greater than 0".to_string()));
        }
        if self.standing_sample_frames == 0 || self.standing_sample_frames > self.calibration_frames {
            return Err(Error::ConfigError(
                "Standing sample frames must be between 1 and the calibration frame count".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.depth_smoothing) {
            return Err(Error::ConfigError("Depth smoothing must be in [0, 1)".to_string()));
        }
        if !(0.0..0.5).contains(&self.threshold_range_fraction) {
            return Err(Error::ConfigError("Threshold range fraction must be in [0, 0.5)".to_string()));
        }
        if self.depth_change_threshold <= 0.0 || self.return_margin < 0.0 || self.secondary_margin < 0.0 {
            return Err(Error::ConfigError("Angle margins must be non-negative".to_string()));
        }
        if self.min_rep_duration_ms >= self.max_rep_duration_ms {
            return Err(Error::ConfigError(
                "Minimum rep duration must be shorter than the maximum".to_string(),
            ));
        }
        if self.confidence_frames == 0 {
            return Err(Error::ConfigError("Confidence frames must be greater than 0".to_string()));
        }
        if self.tempo_history == 0 {
            return Err(Error::ConfigError("Tempo history must be greater than 0".to_string()));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the text is not a valid configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Create the angle smoothing filter from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilterError`] for unknown filters or invalid parameters
    pub fn create_filter(&self) -> Result<Box<dyn crate::filters::AngleFilter>> {
        use crate::filters::create_filter;

        match self.smoothing.filter.as_str() {
            "exponential" => create_filter(&format!("exponential:{}", self.smoothing.exponential_alpha)),
            "moving_average" => create_filter(&format!("movingaverage:{}", self.smoothing.moving_average_window)),
            name => create_filter(name),
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if !(self.smoothing.exponential_alpha > 0.0 && self.smoothing.exponential_alpha <= 1.0) {
            return Err(Error::ConfigError("Exponential alpha must be in (0, 1]".to_string()));
        }
        if self.smoothing.moving_average_window == 0 {
            return Err(Error::ConfigError(
                "Moving average window size must be greater than 0".to_string(),
            ));
        }
        self.create_filter()
            .map_err(|e| Error::ConfigError(format!("Invalid smoothing filter: {e}")))?;

        self.detector.validate()
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Form coach configuration

# Angle smoothing
smoothing:
  filter: "exponential"
  exponential_alpha: 0.2
  moving_average_window: 5

# Rep detector tuning
detector:
  calibration_frames: 25
  standing_sample_frames: 15
  depth_change_threshold: 15.0
  depth_smoothing: 0.8
  default_depth_floor: 60.0
  default_depth_offset: 80.0
  threshold_range_fraction: 0.2
  return_margin: 5.0
  secondary_margin: 8.0
  debounce_ms: 200
  throttle_ms: 50
  stuck_phase_ms: 5000
  min_rep_duration_ms: 1000
  max_rep_duration_ms: 20000
  confidence_frames: 15
  tempo_history: 10

# Session behavior
session:
  exercise: squat
  voice_enabled: false
  privacy_mode: false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed = Config::from_yaml("session:\n  exercise: pull_up\n").unwrap();
        assert_eq!(parsed.session.exercise, Exercise::PullUp);
        assert_eq!(parsed.detector, DetectorConfig::default());
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.detector.min_rep_duration_ms = 30_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.smoothing.filter = "kalman".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detector.standing_sample_frames = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_create_filter() {
        let mut config = Config::default();
        assert_eq!(config.create_filter().unwrap().name(), "ExponentialFilter");

        config.smoothing.filter = "moving_average".to_string();
        assert_eq!(config.create_filter().unwrap().name(), "MovingAverageFilter");

        config.smoothing.filter = "none".to_string();
        assert_eq!(config.create_filter().unwrap().name(), "NoFilter");
    }
}
