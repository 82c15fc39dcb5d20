//! Coaching feedback items and the session feedback log.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Severity of a feedback item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    /// Positive reinforcement or neutral hint
    Info,
    /// Form correction
    Warning,
    /// Structural defect (valgus, swinging)
    Error,
}

impl FeedbackKind {
    /// Default priority for this severity, higher is more urgent
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Warning => 2,
            Self::Error => 3,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One coaching message attached to a repetition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Repetition during which the message was generated
    pub rep_number: u32,
    pub message: String,
    pub kind: FeedbackKind,
    pub priority: u8,
}

impl Feedback {
    /// Feedback with the default priority for its kind
    pub fn new(rep_number: u32, message: impl Into<String>, kind: FeedbackKind) -> Self {
        Self {
            rep_number,
            message: message.into(),
            kind,
            priority: kind.priority(),
        }
    }
}

/// Receiver for feedback produced at rep completion.
///
/// Items the sink rejects are left out of the rep report, so a sink decides
/// both where feedback goes and which of it reaches the user.
pub trait FeedbackSink {
    /// Offer one item; returns `true` if it was accepted
    fn submit(&mut self, feedback: Feedback) -> bool;

    /// Forget everything received so far; called when the session resets
    fn reset(&mut self) {}
}

/// Insertion-ordered feedback store that drops repeated `(message, rep)` pairs
#[derive(Debug, Default)]
pub struct FeedbackLog {
    entries: Vec<Feedback>,
    seen: HashSet<(String, u32)>,
}

impl FeedbackLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored entries in insertion order
    #[must_use]
    pub fn entries(&self) -> &[Feedback] {
        &self.entries
    }

    /// Entries for one repetition
    pub fn for_rep(&self, rep_number: u32) -> impl Iterator<Item = &Feedback> {
        self.entries.iter().filter(move |f| f.rep_number == rep_number)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }
}

impl FeedbackSink for FeedbackLog {
    fn submit(&mut self, feedback: Feedback) -> bool {
        if !self.seen.insert((feedback.message.clone(), feedback.rep_number)) {
            return false;
        }
        self.entries.push(feedback);
        true
    }

    fn reset(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_suppressed() {
        let mut log = FeedbackLog::new();
        assert!(log.submit(Feedback::new(1, "Go deeper", FeedbackKind::Warning)));
        assert!(!log.submit(Feedback::new(1, "Go deeper", FeedbackKind::Warning)));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_same_message_other_rep_kept() {
        let mut log = FeedbackLog::new();
        log.submit(Feedback::new(1, "Go deeper", FeedbackKind::Warning));
        log.submit(Feedback::new(2, "Go deeper", FeedbackKind::Warning));
        log.submit(Feedback::new(2, "Keep your chest up", FeedbackKind::Warning));

        assert_eq!(log.len(), 3);
        assert_eq!(log.for_rep(2).count(), 2);
        assert_eq!(log.entries()[2].message, "Keep your chest up");
    }

    #[test]
    fn test_reset_through_sink() {
        let mut log = FeedbackLog::new();
        log.submit(Feedback::new(1, "Go deeper", FeedbackKind::Warning));

        FeedbackSink::reset(&mut log);
        assert!(log.is_empty());
        assert!(log.submit(Feedback::new(1, "Go deeper", FeedbackKind::Warning)));
    }

    #[test]
    fn test_priorities() {
        assert!(FeedbackKind::Error.priority() > FeedbackKind::Warning.priority());
        assert!(FeedbackKind::Warning.priority() > FeedbackKind::Info.priority());
        assert_eq!(Feedback::new(3, "x", FeedbackKind::Error).priority, 3);
    }
}
