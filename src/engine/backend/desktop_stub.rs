use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::SessionError;
use crate::scheduler::RoundExport;

use super::{ClickEmitter, LiveRow, MetricSink, TimeSource};

/// Click emitter that only logs, used for headless runs and tests.
#[derive(Debug, Default)]
pub struct LogClickEmitter {
    clicks: u64,
}

impl LogClickEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }
}

impl ClickEmitter for LogClickEmitter {
    fn play_click(&mut self, channel: u8) {
        self.clicks += 1;
        log::trace!("[LogClickEmitter] click #{} on channel {}", self.clicks, channel);
    }
}

/// In-memory sink keeping the newest row and every persisted round.
#[derive(Debug, Default)]
pub struct MemoryMetricSink {
    latest: Option<LiveRow>,
    published: u64,
    exports: Vec<RoundExport>,
}

impl MemoryMetricSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<&LiveRow> {
        self.latest.as_ref()
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn exports(&self) -> &[RoundExport] {
        &self.exports
    }
}

impl MetricSink for MemoryMetricSink {
    fn publish_row(&mut self, row: LiveRow) {
        self.published += 1;
        self.latest = Some(row);
    }

    fn persist_round(&mut self, export: RoundExport) -> Result<(), SessionError> {
        self.exports.push(export);
        Ok(())
    }
}

/// Manually advanced time source for deterministic runs.
///
/// Time only moves when [`ManualTimeSource::advance`] is called.
pub struct ManualTimeSource {
    start: Instant,
    offset_us: AtomicU64,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset_us: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_us
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    /// Seconds elapsed since creation.
    pub fn elapsed_secs(&self) -> f64 {
        self.offset_us.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Instant {
        self.start + Duration::from_micros(self.offset_us.load(Ordering::SeqCst))
    }
}
