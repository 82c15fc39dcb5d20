//! Real-time exercise form analysis from body-pose landmarks.
//!
//! This library turns a stream of 33-point body landmarks into joint angles,
//! a repetition count and per-rep coaching feedback:
//! - Joint angles computed from 2D landmark geometry with per-session smoothing
//! - A rules engine scoring each rep against an exercise rule table
//! - A self-calibrating repetition detector with hysteresis and debouncing
//!
//! The pipeline for one frame:
//! 1. Angle calculation (trunk, hip, knee, shoulder, elbow, ankle)
//! 2. Rep detection on the smoothed angles
//! 3. On a counted rep, scoring and feedback from the rules engine
//!
//! # Examples
//!
//! ## Running a session
//!
//! ```no_run
//! use form_coach::{landmarks::Landmark, rules::Exercise, session::Session};
//! use std::time::Duration;
//!
//! # fn next_frame() -> Option<(Vec<Landmark>, Duration)> { None }
//! let mut session = Session::new(Exercise::Squat);
//!
//! while let Some((landmarks, timestamp)) = next_frame() {
//!     let outcome = session.process_frame(&landmarks, timestamp);
//!
//!     if let Some(report) = outcome.report {
//!         println!("Rep {} scored {}", report.rep_number, report.score());
//!         for item in &report.feedback {
//!             println!("  [{}] {}", item.kind, item.message);
//!         }
//!     }
//! }
//! ```
//!
//! ## Using the components directly
//!
//! ```
//! use form_coach::{
//!     angles::AngleCalculator,
//!     rep_detector::{RepDetector, RepPhase},
//!     rules::{evaluate_angle, Exercise},
//! };
//! use std::time::Duration;
//!
//! let mut calculator = AngleCalculator::new();
//! let mut detector = RepDetector::new(Exercise::Squat);
//!
//! // Too few landmarks: every angle is reported missing (0.0)
//! let angles = calculator.calculate(&[]);
//! assert_eq!(angles.hip, 0.0);
//!
//! let detection = detector.update(&angles, Duration::ZERO);
//! assert_eq!(detection.phase, RepPhase::Idle);
//! assert!(!detection.calibrated);
//!
//! let depth_rule = &Exercise::Squat.rules()[1];
//! assert_eq!(evaluate_angle(depth_rule.optimal, depth_rule), 1.0);
//! ```

/// Body landmark type and visibility helpers
pub mod landmarks;

/// Joint angle computation with per-session smoothing
pub mod angles;

/// Temporal smoothing filters for joint angles
pub mod filters;

/// Exercise rule tables and per-rep scoring
pub mod rules;

/// Repetition detection state machine with calibration
pub mod rep_detector;

/// Feedback items and the deduplicating session log
pub mod feedback;

/// Session controller wiring the pipeline together
pub mod session;

/// Replay of recorded landmark streams
pub mod replay;

/// Error types and result handling
pub mod error;

/// Constants used throughout the pipeline
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
