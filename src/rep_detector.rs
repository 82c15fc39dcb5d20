//! Repetition detection state machine.
//!
//! A detector first calibrates on the user's own baseline, then follows the
//! cycle `Idle -> Starting -> Peak -> Ending -> Complete -> Idle` on a
//! primary angle (hip for squats, elbow for pull-ups) with a secondary angle
//! (knee, shoulder) as an early trigger. Thresholds come from calibration,
//! transitions are debounced, and a phase that never resolves is forced to
//! complete.
//!
//! Time is supplied by the caller with every frame, so the detector holds no
//! timers and behaves identically when replayed.

use crate::angles::{AngleKind, JointAngles};
use crate::config::DetectorConfig;
use crate::rules::Exercise;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Phase of the current repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepPhase {
    /// At the baseline, waiting for movement
    Idle,
    /// Moving away from the baseline
    Starting,
    /// At or past the deepest point
    Peak,
    /// Returning toward the baseline
    Ending,
    /// Cycle finished; back to `Idle` on the next transition
    Complete,
}

impl RepPhase {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Peak => "peak",
            Self::Ending => "ending",
            Self::Complete => "complete",
        }
    }

    /// Phases that can get stuck and are subject to forced completion
    #[must_use]
    pub const fn is_in_motion(self) -> bool {
        matches!(self, Self::Starting | Self::Peak | Self::Ending)
    }
}

impl fmt::Display for RepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a cycle reached `Complete`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    /// The user returned to the baseline
    Natural,
    /// A phase exceeded the stuck-phase window
    Forced,
}

/// A cycle that just reached `Complete`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepCompletion {
    pub kind: CompletionKind,
    /// Whether the rep counter was incremented
    pub counted: bool,
    /// Time since the cycle entered `Starting`
    pub duration: Duration,
    /// Rep count after this completion
    pub rep_count: u32,
}

/// Detector output for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RepDetection {
    pub phase: RepPhase,
    pub rep_count: u32,
    /// Stability of the current phase in [0, 1]
    pub confidence: f64,
    pub calibrated: bool,
    /// Fraction of calibration frames collected, 1.0 once calibrated
    pub calibration_progress: f64,
    /// Set only on the frame where a cycle completed
    pub completion: Option<RepCompletion>,
}

impl RepDetection {
    /// Whether this frame completed a counted repetition
    #[must_use]
    pub fn completed_rep(&self) -> bool {
        self.completion.is_some_and(|c| c.counted)
    }

    fn initial() -> Self {
        Self {
            phase: RepPhase::Idle,
            rep_count: 0,
            confidence: 0.0,
            calibrated: false,
            calibration_progress: 0.0,
            completion: None,
        }
    }
}

/// Angles the detector follows for one exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionProfile {
    /// Drives every transition; high at the baseline, low at the peak
    pub primary: AngleKind,
    /// Early trigger for leaving and reaching the baseline
    pub secondary: AngleKind,
}

impl MotionProfile {
    #[must_use]
    pub const fn for_exercise(exercise: Exercise) -> Self {
        match exercise {
            Exercise::Squat => Self {
                primary: AngleKind::Hip,
                secondary: AngleKind::Knee,
            },
            Exercise::PullUp => Self {
                primary: AngleKind::Elbow,
                secondary: AngleKind::Shoulder,
            },
        }
    }
}

/// Dynamic thresholds derived from calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Mean primary angle at the baseline
    pub baseline_primary: f64,
    /// Mean secondary angle at the baseline
    pub baseline_secondary: f64,
    /// Estimated primary angle at the deepest point
    pub depth: f64,
    /// Below this the rep has started; above it the rep can finish
    pub standing: f64,
    /// At or below this the rep is at its peak
    pub peak: f64,
    /// Above this the user is on the way back
    pub mid: f64,
}

impl Thresholds {
    /// Derive thresholds from the baseline and the depth estimate
    #[must_use]
    pub fn derive(baseline_primary: f64, baseline_secondary: f64, depth: f64, range_fraction: f64) -> Self {
        let range = baseline_primary - depth;
        let standing = range_fraction.mul_add(-range, baseline_primary);
        let peak = range_fraction.mul_add(range, depth);

        Self {
            baseline_primary,
            baseline_secondary,
            depth,
            standing,
            peak,
            mid: (standing + peak) / 2.0,
        }
    }
}

/// Calibration accumulated over the first frames of a session
#[derive(Debug, Clone, Default)]
struct Calibration {
    frames: u32,
    baseline_primary: f64,
    baseline_secondary: f64,
    depth: Option<f64>,
}

impl Calibration {
    /// Feed one frame; returns thresholds once the last calibration frame is in
    fn observe(&mut self, primary: f64, secondary: f64, config: &DetectorConfig) -> Option<Thresholds> {
        self.frames += 1;

        if self.frames <= config.standing_sample_frames {
            let n = f64::from(self.frames);
            self.baseline_primary += (primary - self.baseline_primary) / n;
            self.baseline_secondary += (secondary - self.baseline_secondary) / n;
        } else {
            let moved = (primary - self.baseline_primary).abs() > config.depth_change_threshold
                || (secondary - self.baseline_secondary).abs() > config.depth_change_threshold;
            if moved && primary < self.baseline_primary {
                self.depth = Some(match self.depth {
                    Some(depth) => config.depth_smoothing.mul_add(depth, (1.0 - config.depth_smoothing) * primary),
                    None => primary,
                });
            }
        }

        (self.frames >= config.calibration_frames).then(|| self.finish(config))
    }

    fn finish(&self, config: &DetectorConfig) -> Thresholds {
        let fallback = config
            .default_depth_floor
            .max(self.baseline_primary - config.default_depth_offset);

        let depth = match self.depth {
            Some(depth) if self.baseline_primary - depth >= config.depth_change_threshold => depth,
            observed => {
                debug!(
                    "No usable depth observed during calibration ({observed:?}); defaulting to {fallback:.1}"
                );
                fallback
            }
        };

        Thresholds::derive(
            self.baseline_primary,
            self.baseline_secondary,
            depth,
            config.threshold_range_fraction,
        )
    }

    fn progress(&self, config: &DetectorConfig) -> f64 {
        (f64::from(self.frames) / f64::from(config.calibration_frames)).min(1.0)
    }
}

/// Per-session repetition detector
pub struct RepDetector {
    exercise: Exercise,
    profile: MotionProfile,
    config: DetectorConfig,
    calibration: Calibration,
    thresholds: Option<Thresholds>,
    phase: RepPhase,
    rep_count: u32,
    frames_in_phase: u32,
    last_transition: Option<Duration>,
    rep_started: Option<Duration>,
    last_processed: Option<Duration>,
    last_detection: RepDetection,
    tempo: VecDeque<Duration>,
}

impl RepDetector {
    /// Detector with the default tuning
    #[must_use]
    pub fn new(exercise: Exercise) -> Self {
        Self::with_config(exercise, DetectorConfig::default())
    }

    /// Detector with custom tuning
    #[must_use]
    pub fn with_config(exercise: Exercise, config: DetectorConfig) -> Self {
        let tempo = VecDeque::with_capacity(config.tempo_history);
        Self {
            exercise,
            profile: MotionProfile::for_exercise(exercise),
            config,
            calibration: Calibration::default(),
            thresholds: None,
            phase: RepPhase::Idle,
            rep_count: 0,
            frames_in_phase: 0,
            last_transition: None,
            rep_started: None,
            last_processed: None,
            last_detection: RepDetection::initial(),
            tempo,
        }
    }

    /// Process one frame of angles captured at `timestamp` (time since session start).
    ///
    /// Frames arriving sooner than the throttle interval after the last
    /// processed frame are not processed; they get the last detection back
    /// without its completion event.
    pub fn update(&mut self, angles: &JointAngles, timestamp: Duration) -> RepDetection {
        if let Some(last) = self.last_processed {
            if timestamp.saturating_sub(last) < self.config.throttle() {
                return RepDetection {
                    completion: None,
                    ..self.last_detection.clone()
                };
            }
        }
        self.last_processed = Some(timestamp);

        let primary = angles.measured(self.profile.primary);
        let secondary = angles.measured(self.profile.secondary);

        let completion = match self.thresholds {
            None => {
                if let (Some(p), Some(s)) = (primary, secondary) {
                    self.calibrate(p, s);
                }
                None
            }
            Some(thresholds) => self.track(&thresholds, primary, secondary, timestamp),
        };

        let detection = self.snapshot(completion);
        self.last_detection = detection.clone();
        detection
    }

    fn calibrate(&mut self, primary: f64, secondary: f64) {
        if let Some(thresholds) = self.calibration.observe(primary, secondary, &self.config) {
            info!(
                "{} calibrated: baseline {:.1}/{:.1}, depth {:.1}, standing {:.1} peak {:.1} mid {:.1}",
                self.exercise,
                thresholds.baseline_primary,
                thresholds.baseline_secondary,
                thresholds.depth,
                thresholds.standing,
                thresholds.peak,
                thresholds.mid
            );
            self.thresholds = Some(thresholds);
            self.frames_in_phase = 0;
        }
    }

    fn track(
        &mut self,
        thresholds: &Thresholds,
        primary: Option<f64>,
        secondary: Option<f64>,
        now: Duration,
    ) -> Option<RepCompletion> {
        self.frames_in_phase = self.frames_in_phase.saturating_add(1);

        let since_transition = self.last_transition.map(|t| now.saturating_sub(t));

        if self.phase.is_in_motion() && since_transition.is_some_and(|elapsed| elapsed > self.config.stuck_phase()) {
            warn!(
                "{} stuck in {} for {:?}; forcing completion",
                self.exercise,
                self.phase,
                since_transition.unwrap_or_default()
            );
            return Some(self.complete(now, CompletionKind::Forced));
        }

        if since_transition.is_some_and(|elapsed| elapsed < self.config.debounce()) {
            return None;
        }

        let next = self.next_phase(thresholds, primary, secondary)?;
        if next == RepPhase::Complete {
            return Some(self.complete(now, CompletionKind::Natural));
        }

        self.transition(next, now);
        None
    }

    /// Transition table; `None` means stay
    fn next_phase(&self, t: &Thresholds, primary: Option<f64>, secondary: Option<f64>) -> Option<RepPhase> {
        if self.phase == RepPhase::Complete {
            return Some(RepPhase::Idle);
        }

        let p = primary?;
        let secondary_trigger = t.baseline_secondary - self.config.secondary_margin;
        let secondary_below = secondary.is_some_and(|s| s < secondary_trigger);
        let secondary_above = secondary.is_some_and(|s| s > secondary_trigger);

        match self.phase {
            RepPhase::Idle if p < t.standing || secondary_below => Some(RepPhase::Starting),
            RepPhase::Starting if p <= t.peak => Some(RepPhase::Peak),
            RepPhase::Starting if p > t.standing + self.config.return_margin => Some(RepPhase::Idle),
            RepPhase::Peak if p > t.mid => Some(RepPhase::Ending),
            RepPhase::Ending if p > t.standing || secondary_above => Some(RepPhase::Complete),
            RepPhase::Ending if p <= t.peak => Some(RepPhase::Peak),
            _ => None,
        }
    }

    fn transition(&mut self, next: RepPhase, now: Duration) {
        debug!("{} phase {} -> {} at {:?}", self.exercise, self.phase, next, now);

        match next {
            RepPhase::Starting => self.rep_started = Some(now),
            RepPhase::Idle => self.rep_started = None,
            _ => {}
        }

        self.phase = next;
        self.last_transition = Some(now);
        self.frames_in_phase = 0;
    }

    fn complete(&mut self, now: Duration, kind: CompletionKind) -> RepCompletion {
        let duration = self.rep_started.map_or(Duration::ZERO, |start| now.saturating_sub(start));
        let counted = (self.config.min_rep_duration()..=self.config.max_rep_duration()).contains(&duration);

        if counted {
            self.rep_count += 1;
            if self.tempo.len() >= self.config.tempo_history {
                self.tempo.pop_front();
            }
            self.tempo.push_back(duration);
            info!(
                "{} rep {} completed in {:?} ({:?})",
                self.exercise, self.rep_count, duration, kind
            );
        } else {
            warn!("{} cycle of {:?} outside valid rep duration; not counted", self.exercise, duration);
        }

        self.transition(RepPhase::Complete, now);

        RepCompletion {
            kind,
            counted,
            duration,
            rep_count: self.rep_count,
        }
    }

    fn snapshot(&self, completion: Option<RepCompletion>) -> RepDetection {
        let calibrated = self.thresholds.is_some();
        RepDetection {
            phase: self.phase,
            rep_count: self.rep_count,
            confidence: if calibrated { self.confidence() } else { 0.0 },
            calibrated,
            calibration_progress: if calibrated {
                1.0
            } else {
                self.calibration.progress(&self.config)
            },
            completion,
        }
    }

    /// Stability of the current phase: grows linearly per frame, 1.0 after
    /// the configured number of frames, 0 right after a transition
    #[must_use]
    pub fn confidence(&self) -> f64 {
        (f64::from(self.frames_in_phase) / f64::from(self.config.confidence_frames)).min(1.0)
    }

    /// Mean duration of the recent counted reps
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // History is bounded by config
    pub fn average_tempo(&self) -> Option<Duration> {
        if self.tempo.is_empty() {
            return None;
        }
        let total: Duration = self.tempo.iter().sum();
        Some(total / self.tempo.len() as u32)
    }

    /// Durations of the recent counted reps, oldest first
    #[must_use]
    pub fn tempo_history(&self) -> &VecDeque<Duration> {
        &self.tempo
    }

    /// Back to a freshly constructed state: uncalibrated, idle, zero reps
    pub fn reset(&mut self) {
        debug!("{} detector reset", self.exercise);
        *self = Self::with_config(self.exercise, self.config.clone());
    }

    /// Discard calibration and start it over, keeping the rep count and tempo
    pub fn recalibrate(&mut self) {
        debug!("{} detector recalibrating", self.exercise);
        self.calibration = Calibration::default();
        self.thresholds = None;
        self.phase = RepPhase::Idle;
        self.frames_in_phase = 0;
        self.last_transition = None;
        self.rep_started = None;
        self.last_processed = None;
        self.last_detection = RepDetection {
            rep_count: self.rep_count,
            ..RepDetection::initial()
        };
    }

    #[must_use]
    pub const fn exercise(&self) -> Exercise {
        self.exercise
    }

    #[must_use]
    pub const fn profile(&self) -> MotionProfile {
        self.profile
    }

    #[must_use]
    pub const fn phase(&self) -> RepPhase {
        self.phase
    }

    #[must_use]
    pub const fn rep_count(&self) -> u32 {
        self.rep_count
    }

    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        self.thresholds.is_some()
    }

    /// Thresholds derived by calibration, once it has finished
    #[must_use]
    pub const fn thresholds(&self) -> Option<&Thresholds> {
        self.thresholds.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn squat(hip: f64, knee: f64) -> JointAngles {
        JointAngles {
            hip,
            knee,
            ..JointAngles::default()
        }
    }

    #[test]
    fn test_threshold_derivation() {
        let t = Thresholds::derive(170.0, 175.0, 70.0, 0.2);
        assert!((t.standing - 150.0).abs() < 1e-9);
        assert!((t.peak - 90.0).abs() < 1e-9);
        assert!((t.mid - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_depth_without_movement() {
        let mut detector = RepDetector::new(Exercise::Squat);
        for i in 0..25 {
            detector.update(&squat(170.0, 175.0), ms(i * 100));
        }
        let t = detector.thresholds().copied().unwrap();
        assert!((t.depth - 90.0).abs() < 1e-9); // max(60, 170 - 80)

        let mut detector = RepDetector::new(Exercise::Squat);
        for i in 0..25 {
            detector.update(&squat(120.0, 175.0), ms(i * 100));
        }
        assert!((detector.thresholds().unwrap().depth - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_calibration_skips_missing_frames() {
        let mut detector = RepDetector::new(Exercise::Squat);
        for i in 0..24 {
            detector.update(&squat(170.0, 175.0), ms(i * 100));
        }
        detector.update(&squat(0.0, 175.0), ms(2_400));
        assert!(!detector.is_calibrated());
        detector.update(&squat(170.0, 175.0), ms(2_500));
        assert!(detector.is_calibrated());
    }

    #[test]
    fn test_throttled_frame_returns_last_detection() {
        let mut detector = RepDetector::new(Exercise::Squat);
        let first = detector.update(&squat(170.0, 175.0), ms(0));
        let throttled = detector.update(&squat(170.0, 175.0), ms(20));
        assert_eq!(first, throttled);
        assert!((first.calibration_progress - 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_average_tempo_empty() {
        let detector = RepDetector::new(Exercise::PullUp);
        assert_eq!(detector.average_tempo(), None);
        assert_eq!(detector.profile().primary, AngleKind::Elbow);
    }
}
