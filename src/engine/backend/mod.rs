//! Capability interfaces the scheduler drives, plus their stock backends.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::clock::SessionClock;
use crate::error::SessionError;
use crate::performance::MetricRow;
use crate::scheduler::RoundExport;

/// Most recent resolved row, as consumed by live visualization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveRow {
    pub round: u32,
    pub note: i64,
    pub bpm: f64,
    pub row: MetricRow,
}

/// Metronome output.
///
/// Called from the timing thread; implementations must return immediately.
pub trait ClickEmitter: Send {
    fn play_click(&mut self, channel: u8);
}

/// Destination for resolved rows and finished rounds.
pub trait MetricSink: Send {
    /// Latest row of the running round; readers only care about the newest.
    fn publish_row(&mut self, row: LiveRow);

    /// Hand off a validated round for persistence without blocking.
    fn persist_round(&mut self, export: RoundExport) -> Result<(), SessionError>;
}

/// Surface refresh invoked first on every tick.
pub trait RefreshHook: Send {
    fn refresh(&mut self, clock: &SessionClock);
}

/// Trait representing a monotonic time source for the scheduler loop.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default time source backed by `Instant::now`.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

mod desktop_stub;
mod round_writer;

pub use desktop_stub::{LogClickEmitter, ManualTimeSource, MemoryMetricSink};
pub use round_writer::{file_safe_pseudonym, round_file_name, write_round_file, RoundFileWriter};
