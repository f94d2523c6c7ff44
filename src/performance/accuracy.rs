//! Accuracy and performance scoring for a single resolved unit
//!
//! Both functions are pure: they take the press offset and the tempo in
//! effect and return a score in [0, 1]. Timing classification reuses the same
//! inputs to label a press as early, on time or late for feedback.

use serde::{Deserialize, Serialize};

/// Boost applied before clamping, so near-perfect presses score a full 1.0.
pub const ACCURACY_BOOST: f64 = 1.3;

/// Fraction of the tempo (one quarter note) inside which a press still scores.
pub const SCORING_WINDOW: f64 = 0.5;

/// Timing accuracy of a press `delay` seconds away from its scheduled instant.
///
/// # Arguments
/// * `delay` - Absolute press offset in seconds
/// * `tempo` - Seconds per quarter note at resolution time
///
/// # Returns
/// `min(1.3 × (1 − delay / (0.5 × tempo)), 1.0)` inside the window, `0.0` outside
pub fn compute_accuracy(delay: f64, tempo: f64) -> f64 {
    let max_delay = SCORING_WINDOW * tempo;
    let delay = delay.abs();
    if !(max_delay > 0.0) || delay > max_delay {
        return 0.0;
    }
    (ACCURACY_BOOST * (1.0 - delay / max_delay)).min(1.0)
}

/// Accuracy scaled by the tempo relative to the upper bound.
///
/// Errors and zero accuracy always score 0.
pub fn compute_performance(accuracy: f64, error: bool, bpm: f64, max_bpm: f64) -> f64 {
    if error || accuracy <= 0.0 || max_bpm <= 0.0 {
        return 0.0;
    }
    (accuracy * bpm / max_bpm).min(1.0)
}

/// Timing classification for a press relative to its scheduled instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingClassification {
    /// Press within the tolerance of the scheduled instant
    OnTime,
    /// Press more than the tolerance before the scheduled instant
    Early,
    /// Press more than the tolerance after the scheduled instant
    Late,
}

/// Timing feedback with classification and millisecond error
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingFeedback {
    pub classification: TimingClassification,
    /// Signed offset in milliseconds; negative is early
    pub error_ms: f64,
}

impl TimingFeedback {
    /// Tolerance for OnTime as a fraction of the tempo
    pub const TOLERANCE_FRACTION: f64 = 0.1;

    /// Classify a signed press offset (seconds, pressed − scheduled).
    pub fn classify(offset: f64, tempo: f64) -> Self {
        let tolerance = Self::TOLERANCE_FRACTION * tempo;
        let classification = if offset.abs() <= tolerance {
            TimingClassification::OnTime
        } else if offset < 0.0 {
            TimingClassification::Early
        } else {
            TimingClassification::Late
        };
        Self {
            classification,
            error_ms: offset * 1000.0,
        }
    }
}
