//! Exercise rules engine.
//!
//! Scores one completed repetition from its joint angles and the landmarks
//! of the frame on which it completed. Each exercise carries a static rule
//! table; structural checks (knee valgus for squats, chin-over-bar and
//! swinging for pull-ups) run on landmarks directly.
//!
//! The engine is stateless. It emits one feedback line per triggered
//! condition and leaves deduplication to the feedback sink.

use crate::angles::{AngleKind, JointAngles};
use crate::constants::{
    CHIN_TOLERANCE, IMAGE_CENTER_X, LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, NOSE, OUT_OF_RANGE_BOUNDARY_SCORE,
    OUT_OF_RANGE_FALLOFF_DEGREES, RIGHT_ANKLE, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER, SWING_THRESHOLD, VALGUS_RATIO,
};
use crate::feedback::{Feedback, FeedbackKind};
use crate::landmarks::{visible_points, Landmark};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Flag raised when the knees cave inward during a squat
pub const FLAG_KNEE_VALGUS: &str = "knee_valgus";
/// Flag raised when the hips drift sideways during a pull-up
pub const FLAG_SWINGING: &str = "swinging";
/// Flag raised when no metric of the rule table could be measured
pub const FLAG_INSUFFICIENT_VISIBILITY: &str = "insufficient_visibility";

/// Supported exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exercise {
    Squat,
    PullUp,
}

impl Exercise {
    /// Static rule table for this exercise
    #[must_use]
    pub fn rules(self) -> &'static [ExerciseRule] {
        match self {
            Self::Squat => &SQUAT_RULES,
            Self::PullUp => &PULL_UP_RULES,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::PullUp => "pull_up",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Squat => "Squat",
            Self::PullUp => "Pull-up",
        }
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Exercise {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "squat" => Ok(Self::Squat),
            "pull_up" | "pullup" => Ok(Self::PullUp),
            other => Err(Error::InvalidInput(format!("Unknown exercise: {other}"))),
        }
    }
}

/// What a rule measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    /// One of the joint angles, scored with [`evaluate_angle`]
    Angle(AngleKind),
    /// Nose height against the shoulder line, scored in three steps
    ChinOverBar,
}

impl Metric {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Angle(kind) => kind.name(),
            Self::ChinOverBar => "chin_over_bar",
        }
    }
}

/// Message emitted when a metric score crosses a threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cue {
    pub threshold: f64,
    pub kind: FeedbackKind,
    pub message: &'static str,
}

/// One row of an exercise rule table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExerciseRule {
    pub metric: Metric,
    /// Lower bound of the valid range, degrees (unused for structural metrics)
    pub min: f64,
    /// Upper bound of the valid range, degrees (unused for structural metrics)
    pub max: f64,
    pub optimal: f64,
    /// Share of the overall score; a table's weights sum to 1.0
    pub weight: f64,
    pub label: &'static str,
    /// Emitted when the score is below the cue threshold
    pub correction: Option<Cue>,
    /// Emitted when the score is above the cue threshold
    pub praise: Option<Cue>,
}

static SQUAT_RULES: [ExerciseRule; 3] = [
    ExerciseRule {
        metric: Metric::Angle(AngleKind::Trunk),
        min: 0.0,
        max: 45.0,
        optimal: 20.0,
        weight: 0.3,
        label: "Torso angle",
        correction: Some(Cue {
            threshold: 0.7,
            kind: FeedbackKind::Warning,
            message: "Keep your chest up",
        }),
        praise: None,
    },
    ExerciseRule {
        metric: Metric::Angle(AngleKind::Hip),
        min: 50.0,
        max: 100.0,
        optimal: 75.0,
        weight: 0.4,
        label: "Squat depth",
        correction: Some(Cue {
            threshold: 0.6,
            kind: FeedbackKind::Warning,
            message: "Go deeper - aim for hips at knee height",
        }),
        praise: Some(Cue {
            threshold: 0.9,
            kind: FeedbackKind::Info,
            message: "Great depth!",
        }),
    },
    ExerciseRule {
        metric: Metric::Angle(AngleKind::Knee),
        min: 60.0,
        max: 110.0,
        optimal: 90.0,
        weight: 0.3,
        label: "Knee bend",
        correction: Some(Cue {
            threshold: 0.6,
            kind: FeedbackKind::Warning,
            message: "Control your knee bend - aim for about 90 degrees",
        }),
        praise: None,
    },
];

static PULL_UP_RULES: [ExerciseRule; 3] = [
    ExerciseRule {
        metric: Metric::Angle(AngleKind::Shoulder),
        min: 20.0,
        max: 90.0,
        optimal: 55.0,
        weight: 0.3,
        label: "Shoulder engagement",
        correction: Some(Cue {
            threshold: 0.6,
            kind: FeedbackKind::Warning,
            message: "Pull your shoulders down and back",
        }),
        praise: None,
    },
    ExerciseRule {
        metric: Metric::Angle(AngleKind::Elbow),
        min: 30.0,
        max: 90.0,
        optimal: 60.0,
        weight: 0.3,
        label: "Elbow flexion",
        correction: Some(Cue {
            threshold: 0.6,
            kind: FeedbackKind::Warning,
            message: "Pull higher - bend your elbows more",
        }),
        praise: Some(Cue {
            threshold: 0.9,
            kind: FeedbackKind::Info,
            message: "Strong pull!",
        }),
    },
    ExerciseRule {
        metric: Metric::ChinOverBar,
        min: 0.0,
        max: 1.0,
        optimal: 1.0,
        weight: 0.4,
        label: "Chin over bar",
        correction: Some(Cue {
            threshold: 0.7,
            kind: FeedbackKind::Warning,
            message: "Pull until your chin clears the bar",
        }),
        praise: Some(Cue {
            threshold: 0.9,
            kind: FeedbackKind::Info,
            message: "Chin over the bar - nice!",
        }),
    },
];

const VALGUS_MESSAGE: &str = "Push your knees out - they are caving in";
const SWING_MESSAGE: &str = "Control the swing - keep your body still";

/// Score of one completed repetition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseScore {
    /// Weighted score in [0, 100]
    pub overall: u8,
    /// Per-metric score in [0, 1]; metrics that could not be measured are absent
    pub breakdown: BTreeMap<Metric, f64>,
    pub flags: BTreeSet<String>,
}

impl ExerciseScore {
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

/// Result of evaluating one repetition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub score: ExerciseScore,
    /// Feedback in emission order
    pub feedback: Vec<Feedback>,
}

/// Score an angle against a rule.
///
/// Inside `[min, max]` the score steps down with the distance from
/// `optimal` relative to half the range: up to 20% scores 1.0, 40% 0.9,
/// 60% 0.8, 80% 0.7, and 0.6 beyond. Outside the range the score falls
/// linearly from 0.5 at the boundary to 0 at 10 degrees past it.
#[must_use]
pub fn evaluate_angle(angle: f64, rule: &ExerciseRule) -> f64 {
    if (rule.min..=rule.max).contains(&angle) {
        let half_range = (rule.max - rule.min) / 2.0;
        if half_range <= 0.0 {
            return 1.0;
        }

        let distance = (angle - rule.optimal).abs() / half_range;
        return match distance {
            d if d <= 0.2 => 1.0,
            d if d <= 0.4 => 0.9,
            d if d <= 0.6 => 0.8,
            d if d <= 0.8 => 0.7,
            _ => 0.6,
        };
    }

    let past_boundary = if angle < rule.min { rule.min - angle } else { angle - rule.max };
    let falloff = OUT_OF_RANGE_BOUNDARY_SCORE / OUT_OF_RANGE_FALLOFF_DEGREES;
    falloff.mul_add(-past_boundary, OUT_OF_RANGE_BOUNDARY_SCORE).max(0.0)
}

/// Evaluate one completed repetition.
///
/// `rep_number` is stamped on every feedback item.
#[must_use]
pub fn evaluate(exercise: Exercise, angles: &JointAngles, landmarks: &[Landmark], rep_number: u32) -> Evaluation {
    let mut evaluation = Evaluation::default();
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for rule in exercise.rules() {
        let Some(metric_score) = score_metric(rule, angles, landmarks) else {
            continue;
        };

        weighted += rule.weight * metric_score;
        total_weight += rule.weight;
        evaluation.score.breakdown.insert(rule.metric, metric_score);

        if let Some(cue) = rule.correction.filter(|cue| metric_score < cue.threshold) {
            evaluation.feedback.push(Feedback::new(rep_number, cue.message, cue.kind));
        } else if let Some(cue) = rule.praise.filter(|cue| metric_score > cue.threshold) {
            evaluation.feedback.push(Feedback::new(rep_number, cue.message, cue.kind));
        }
    }

    if total_weight > 0.0 {
        evaluation.score.overall = to_percent(weighted / total_weight);
    } else {
        evaluation.score.flags.insert(FLAG_INSUFFICIENT_VISIBILITY.to_string());
    }

    let structural = match exercise {
        Exercise::Squat => knee_valgus(landmarks).then_some((FLAG_KNEE_VALGUS, VALGUS_MESSAGE)),
        Exercise::PullUp => swinging(landmarks).then_some((FLAG_SWINGING, SWING_MESSAGE)),
    };
    if let Some((flag, message)) = structural {
        evaluation.score.flags.insert(flag.to_string());
        evaluation.feedback.push(Feedback::new(rep_number, message, FeedbackKind::Error));
    }

    evaluation
}

fn score_metric(rule: &ExerciseRule, angles: &JointAngles, landmarks: &[Landmark]) -> Option<f64> {
    match rule.metric {
        Metric::Angle(kind) => angles.measured(kind).map(|angle| evaluate_angle(angle, rule)),
        Metric::ChinOverBar => chin_over_bar(landmarks),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped to [0, 100]
fn to_percent(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Knees caving in: knee separation below 80% of ankle separation.
/// `false` when any of the four landmarks is not visible.
#[must_use]
pub fn knee_valgus(landmarks: &[Landmark]) -> bool {
    visible_points(landmarks, [LEFT_KNEE, RIGHT_KNEE, LEFT_ANKLE, RIGHT_ANKLE]).is_some_and(
        |[left_knee, right_knee, left_ankle, right_ankle]| {
            let knee_gap = (left_knee.0 - right_knee.0).abs();
            let ankle_gap = (left_ankle.0 - right_ankle.0).abs();
            knee_gap < VALGUS_RATIO * ankle_gap
        },
    )
}

/// Chin-over-bar score from the nose height relative to the shoulder midline:
/// above is 1.0, slightly below 0.7, well below 0.3.
/// `None` when the nose or either shoulder is not visible.
#[must_use]
pub fn chin_over_bar(landmarks: &[Landmark]) -> Option<f64> {
    let [nose, left, right] = visible_points(landmarks, [NOSE, LEFT_SHOULDER, RIGHT_SHOULDER])?;
    let shoulder_line = (left.1 + right.1) / 2.0;
    // Image y grows downward
    let below = nose.1 - shoulder_line;

    Some(if below < 0.0 {
        1.0
    } else if below <= CHIN_TOLERANCE {
        0.7
    } else {
        0.3
    })
}

/// Hips displaced horizontally from the image center by more than the swing threshold.
/// `false` when either hip is not visible.
#[must_use]
pub fn swinging(landmarks: &[Landmark]) -> bool {
    visible_points(landmarks, [LEFT_HIP, RIGHT_HIP]).is_some_and(|[left, right]| {
        let center = (left.0 + right.0) / 2.0;
        (center - IMAGE_CENTER_X).abs() > SWING_THRESHOLD
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(min: f64, max: f64, optimal: f64) -> ExerciseRule {
        ExerciseRule {
            metric: Metric::Angle(AngleKind::Hip),
            min,
            max,
            optimal,
            weight: 1.0,
            label: "test",
            correction: None,
            praise: None,
        }
    }

    #[test]
    fn test_tiers() {
        let r = rule(0.0, 100.0, 50.0);
        assert_eq!(evaluate_angle(50.0, &r), 1.0);
        assert_eq!(evaluate_angle(60.0, &r), 1.0); // 0.2
        assert_eq!(evaluate_angle(65.0, &r), 0.9); // 0.3
        assert_eq!(evaluate_angle(75.0, &r), 0.8); // 0.5
        assert_eq!(evaluate_angle(85.0, &r), 0.7); // 0.7
        assert_eq!(evaluate_angle(95.0, &r), 0.6); // 0.9
        assert_eq!(evaluate_angle(100.0, &r), 0.6);
    }

    #[test]
    fn test_out_of_range_falloff() {
        let r = rule(50.0, 100.0, 75.0);
        assert!((evaluate_angle(100.000_001, &r) - 0.5).abs() < 1e-6);
        assert!((evaluate_angle(105.0, &r) - 0.25).abs() < 1e-9);
        assert!((evaluate_angle(45.0, &r) - 0.25).abs() < 1e-9);
        assert_eq!(evaluate_angle(110.0, &r), 0.0);
        assert_eq!(evaluate_angle(150.0, &r), 0.0);
    }

    #[test]
    fn test_tables_sum_to_one() {
        for exercise in [Exercise::Squat, Exercise::PullUp] {
            let total: f64 = exercise.rules().iter().map(|r| r.weight).sum();
            assert!((total - 1.0).abs() < 1e-9, "{exercise} weights sum to {total}");
        }
    }

    #[test]
    fn test_exercise_parsing() {
        assert_eq!("squat".parse::<Exercise>().unwrap(), Exercise::Squat);
        assert_eq!("Pull-Up".parse::<Exercise>().unwrap(), Exercise::PullUp);
        assert_eq!("pullup".parse::<Exercise>().unwrap(), Exercise::PullUp);
        assert!("deadlift".parse::<Exercise>().is_err());
    }

    #[test]
    fn test_no_landmarks_no_structural_checks() {
        assert!(!knee_valgus(&[]));
        assert!(!swinging(&[]));
        assert_eq!(chin_over_bar(&[]), None);
    }

    #[test]
    fn test_nothing_measured() {
        let evaluation = evaluate(Exercise::Squat, &JointAngles::default(), &[], 1);
        assert_eq!(evaluation.score.overall, 0);
        assert!(evaluation.score.has_flag(FLAG_INSUFFICIENT_VISIBILITY));
        assert!(evaluation.feedback.is_empty());
    }
}
