//! Core telemetry event types describing session activity exposed to the
//! CLI and to stream subscribers.

use serde::{Deserialize, Serialize};

use crate::performance::{TempoChangeReason, TimingClassification};

/// Rich metric events covering resolution, tempo, input and scheduling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    SessionStarted {
        bpm: f64,
        timestamp_ms: u64,
    },
    SessionStopped {
        round: u32,
        timestamp_ms: u64,
    },
    TempoChanged {
        bpm: f64,
        reason: TempoChangeReason,
    },
    UnitResolved {
        note: i64,
        accuracy: f64,
        performance: f64,
        performance_24: Option<f64>,
        bpm: f64,
        error: bool,
        timing: Option<TimingClassification>,
    },
    Mispress {
        expected: Option<char>,
        got: char,
    },
    SchedulerOverrun {
        tick: u64,
        late_ms: f64,
        coalesced: bool,
    },
    RoundAwaitingValidation {
        round: u32,
    },
    RoundFlushed {
        round: u32,
        rows: usize,
        persisted: bool,
    },
}
