//! Round bookkeeping: phases, verdicts and the export record.

use serde::{Deserialize, Serialize};

use crate::config::{TrainingDay, TrainingMode};
use crate::performance::MetricRow;

/// Where the note counter sits relative to the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Count-in before the first note of the session
    PreRound,
    /// Notes of the round are being played
    Active,
    /// A finished round waits for a verdict; ticks are suspended
    AwaitingValidation,
}

/// Player decision on a finished round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundVerdict {
    /// Keep the round
    Accept,
    /// Discard the round
    Decline,
    /// Discard the round, flagged as disturbed by a technical problem
    TechnicalProblem,
}

impl RoundVerdict {
    pub fn persists(self) -> bool {
        self == RoundVerdict::Accept
    }
}

/// One finished round, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundExport {
    pub round: u32,
    pub pseudonym: String,
    pub mode: TrainingMode,
    pub day: TrainingDay,
    /// Wall-clock time of the flush, used to key the record
    pub started_unix_ms: u64,
    pub rows: Vec<MetricRow>,
}

/// Round held back while waiting for a verdict.
#[derive(Debug, Clone)]
pub(crate) struct PendingRound {
    pub(crate) export: RoundExport,
    /// Scheduler time the round was parked at
    pub(crate) parked_at: f64,
}

/// Result of settling a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoundOutcome {
    pub round: u32,
    pub rows: usize,
    pub persisted: bool,
}
