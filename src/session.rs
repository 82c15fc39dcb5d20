//! Session controller wiring the pipeline for one exercise.
//!
//! A [`Session`] owns one angle calculator, one rep detector and one
//! [`FeedbackSink`], a [`FeedbackLog`] unless the owner supplies its own
//! through [`Session::with_sink`]. Every frame goes through the calculator
//! and the detector; the rules engine runs only when the detector reports a
//! counted rep, on the deepest frame of that rep.
//!
//! Ending a session means dropping it. [`Session::reset`] starts a new
//! recording on the same instance with no state carried over.

use crate::angles::{AngleCalculator, JointAngles};
use crate::config::{Config, SessionConfig};
use crate::feedback::{Feedback, FeedbackLog, FeedbackSink};
use crate::landmarks::Landmark;
use crate::rep_detector::{MotionProfile, RepCompletion, RepDetection, RepDetector, RepPhase};
use crate::rules::{self, Evaluation, Exercise};
use crate::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of processing one frame
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// Smoothed angles for this frame
    pub angles: JointAngles,
    pub detection: RepDetection,
    /// Present only on the frame that completed a counted rep
    pub report: Option<RepReport>,
}

/// Evaluation of one counted repetition
#[derive(Debug, Clone)]
pub struct RepReport {
    pub rep_number: u32,
    pub completion: RepCompletion,
    /// Angles at the deepest frame of the rep
    pub angles: JointAngles,
    pub evaluation: Evaluation,
    /// Feedback accepted by the session log for this rep, in emission order
    pub feedback: Vec<Feedback>,
}

impl RepReport {
    /// Overall score in [0, 100]
    #[must_use]
    pub fn score(&self) -> u8 {
        self.evaluation.score.overall
    }

    /// Structural flags raised for this rep
    #[must_use]
    pub fn flags(&self) -> Vec<String> {
        self.evaluation.score.flags.iter().cloned().collect()
    }
}

/// Numeric-only session summary for the text-generation endpoint.
/// Never contains landmarks or imagery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub exercise: Exercise,
    /// Angles at the deepest frame of the last rep
    pub angles: JointAngles,
    pub flags: Vec<String>,
    /// Score of the last rep
    pub score: u8,
    pub rep_count: u32,
    pub average_score: f64,
}

/// Deepest frame seen since the current rep started
#[derive(Debug, Clone)]
struct PeakFrame {
    primary: f64,
    angles: JointAngles,
    landmarks: Vec<Landmark>,
}

/// One exercise session, delivering feedback to `S`
pub struct Session<S: FeedbackSink = FeedbackLog> {
    exercise: Exercise,
    profile: MotionProfile,
    calculator: AngleCalculator,
    detector: RepDetector,
    feedback: S,
    voice_enabled: bool,
    privacy_mode: bool,
    peak: Option<PeakFrame>,
    score_total: u64,
    scored_reps: u32,
    last_report: Option<RepReport>,
}

impl Session {
    /// Session with the default configuration
    #[must_use]
    pub fn new(exercise: Exercise) -> Self {
        Self::assemble(
            exercise,
            AngleCalculator::new(),
            RepDetector::new(exercise),
            &SessionConfig::default(),
            FeedbackLog::new(),
        )
    }

    /// Session for the configured exercise
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_config(config.session.exercise, config)
    }

    /// Session for `exercise` with the remaining settings from `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn with_config(exercise: Exercise, config: &Config) -> Result<Self> {
        Self::with_sink(exercise, config, FeedbackLog::new())
    }
}

impl<S: FeedbackSink> Session<S> {
    /// Session for `exercise` that hands rep feedback to `sink`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn with_sink(exercise: Exercise, config: &Config, sink: S) -> Result<Self> {
        config.validate()?;
        let calculator = AngleCalculator::with_filter(config.create_filter()?);
        let detector = RepDetector::with_config(exercise, config.detector.clone());
        Ok(Self::assemble(exercise, calculator, detector, &config.session, sink))
    }

    fn assemble(
        exercise: Exercise,
        calculator: AngleCalculator,
        detector: RepDetector,
        settings: &SessionConfig,
        feedback: S,
    ) -> Self {
        Self {
            exercise,
            profile: MotionProfile::for_exercise(exercise),
            calculator,
            detector,
            feedback,
            voice_enabled: settings.voice_enabled,
            privacy_mode: settings.privacy_mode,
            peak: None,
            score_total: 0,
            scored_reps: 0,
            last_report: None,
        }
    }

    /// Run one frame through the pipeline
    pub fn process_frame(&mut self, landmarks: &[Landmark], timestamp: Duration) -> FrameOutcome {
        let angles = self.calculator.calculate(landmarks);
        let detection = self.detector.update(&angles, timestamp);

        if detection.phase.is_in_motion() {
            self.track_peak(&angles, landmarks);
        } else if detection.phase == RepPhase::Idle {
            self.peak = None;
        }

        let report = match detection.completion {
            Some(completion) if completion.counted => Some(self.score_rep(completion, &angles, landmarks)),
            Some(_) => {
                self.peak = None;
                None
            }
            None => None,
        };

        FrameOutcome {
            angles,
            detection,
            report,
        }
    }

    fn track_peak(&mut self, angles: &JointAngles, landmarks: &[Landmark]) {
        let Some(primary) = angles.measured(self.profile.primary) else {
            return;
        };
        if self.peak.as_ref().is_some_and(|peak| peak.primary <= primary) {
            return;
        }
        self.peak = Some(PeakFrame {
            primary,
            angles: *angles,
            landmarks: landmarks.to_vec(),
        });
    }

    fn score_rep(&mut self, completion: RepCompletion, angles: &JointAngles, landmarks: &[Landmark]) -> RepReport {
        let rep_number = completion.rep_count;
        let (peak_angles, evaluation) = match self.peak.take() {
            Some(peak) => (peak.angles, rules::evaluate(self.exercise, &peak.angles, &peak.landmarks, rep_number)),
            None => (*angles, rules::evaluate(self.exercise, angles, landmarks, rep_number)),
        };

        let feedback = evaluation
            .feedback
            .iter()
            .filter(|item| self.feedback.submit((*item).clone()))
            .cloned()
            .collect();

        self.score_total += u64::from(evaluation.score.overall);
        self.scored_reps += 1;

        debug!(
            "{} rep {} scored {} with flags {:?}",
            self.exercise, rep_number, evaluation.score.overall, evaluation.score.flags
        );

        let report = RepReport {
            rep_number,
            completion,
            angles: peak_angles,
            evaluation,
            feedback,
        };
        self.last_report = Some(report.clone());
        report
    }

    /// Spoken cues for a rep: the rep count, then `"<exercise>: <message>"`
    /// for each feedback item, most urgent first. Empty when voice is off.
    #[must_use]
    pub fn voice_cues(&self, report: &RepReport) -> Vec<String> {
        if !self.voice_enabled {
            return Vec::new();
        }

        let mut items: Vec<&Feedback> = report.feedback.iter().collect();
        items.sort_by(|a, b| b.priority.cmp(&a.priority));

        std::iter::once(format!("Rep {}", report.rep_number))
            .chain(
                items
                    .into_iter()
                    .map(|item| format!("{}: {}", self.exercise.display_name(), item.message)),
            )
            .collect()
    }

    /// Summary for the text-generation endpoint; `None` in privacy mode or
    /// before the first scored rep
    #[must_use]
    pub fn summary_request(&self) -> Option<SessionSummary> {
        if self.privacy_mode {
            return None;
        }

        let report = self.last_report.as_ref()?;
        Some(SessionSummary {
            exercise: self.exercise,
            angles: report.angles,
            flags: report.flags(),
            score: report.score(),
            rep_count: self.detector.rep_count(),
            average_score: self.average_score().unwrap_or_default(),
        })
    }

    /// Mean score over the scored reps of this session
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Score totals stay far below 2^52
    pub fn average_score(&self) -> Option<f64> {
        (self.scored_reps > 0).then(|| self.score_total as f64 / f64::from(self.scored_reps))
    }

    /// Start a new recording: smoothing, calibration, reps, feedback and
    /// statistics are all cleared
    pub fn reset(&mut self) {
        debug!("{} session reset", self.exercise);
        self.calculator.reset();
        self.detector.reset();
        self.feedback.reset();
        self.peak = None;
        self.score_total = 0;
        self.scored_reps = 0;
        self.last_report = None;
    }

    /// Calibrate again without losing the reps counted so far
    pub fn recalibrate(&mut self) {
        self.detector.recalibrate();
        self.peak = None;
    }

    pub fn set_voice_enabled(&mut self, enabled: bool) {
        self.voice_enabled = enabled;
    }

    pub fn set_privacy_mode(&mut self, enabled: bool) {
        self.privacy_mode = enabled;
    }

    #[must_use]
    pub const fn exercise(&self) -> Exercise {
        self.exercise
    }

    #[must_use]
    pub fn feedback(&self) -> &S {
        &self.feedback
    }

    #[must_use]
    pub fn detector(&self) -> &RepDetector {
        &self.detector
    }

    #[must_use]
    pub fn rep_count(&self) -> u32 {
        self.detector.rep_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackKind;
    use crate::rep_detector::CompletionKind;

    fn report(feedback: Vec<Feedback>) -> RepReport {
        RepReport {
            rep_number: 2,
            completion: RepCompletion {
                kind: CompletionKind::Natural,
                counted: true,
                duration: Duration::from_millis(1_500),
                rep_count: 2,
            },
            angles: JointAngles::default(),
            evaluation: Evaluation::default(),
            feedback,
        }
    }

    #[test]
    fn test_voice_cues_disabled_by_default() {
        let session = Session::new(Exercise::Squat);
        assert!(session.voice_cues(&report(vec![])).is_empty());
    }

    #[test]
    fn test_voice_cues_ordered_by_priority() {
        let mut session = Session::new(Exercise::Squat);
        session.set_voice_enabled(true);

        let cues = session.voice_cues(&report(vec![
            Feedback::new(2, "Great depth!", FeedbackKind::Info),
            Feedback::new(2, "Push your knees out", FeedbackKind::Error),
        ]));

        assert_eq!(cues, vec!["Rep 2", "Squat: Push your knees out", "Squat: Great depth!"]);
    }

    #[test]
    fn test_no_summary_before_first_rep() {
        let session = Session::new(Exercise::PullUp);
        assert_eq!(session.summary_request(), None);
        assert_eq!(session.average_score(), None);
    }
}
