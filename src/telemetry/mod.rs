//! Session telemetry collector and helpers.
//!
//! The collector multiplexes resolution, tempo, input and scheduler events
//! into a bounded history plus an async broadcast stream. A hub is created per
//! session and handed to the scheduler; there is no global instance.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, mpsc};

use crate::performance::{Resolution, TempoChange};

pub mod events;

pub use events::MetricEvent;

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
    pub overruns: u64,
    pub max_late_ms: f64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if self.history_capacity > 0 {
            let mut history = self.history();
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    /// Forward broadcast events into an unbounded channel.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe_unbounded(&self) -> mpsc::UnboundedReceiver<MetricEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut broadcast_rx = self.tx.subscribe();

        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("[Telemetry] Unbounded subscriber lagged by {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        rx
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.history();
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
            overruns: 0,
            max_late_ms: 0.0,
        }
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<MetricEvent>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Lateness tracker keeps a rolling window of overrun magnitudes.
struct LatenessTracker {
    samples: VecDeque<f64>,
    max_samples: usize,
}

impl LatenessTracker {
    fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    fn observe(&mut self, late_ms: f64) {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(late_ms.abs());
    }

    fn max(&self) -> f64 {
        self.samples.iter().copied().fold(0.0_f64, f64::max)
    }
}

/// Per-session hub wrapping the collector plus derived gauges.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    lateness: Mutex<LatenessTracker>,
    overruns: AtomicU64,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize, lateness_window: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            lateness: Mutex::new(LatenessTracker::new(lateness_window)),
            overruns: AtomicU64::new(0),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.collector.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let mut snapshot = self.collector.snapshot();
        snapshot.overruns = self.overruns.load(Ordering::Relaxed);
        snapshot.max_late_ms = self
            .lateness
            .lock()
            .map(|tracker| tracker.max())
            .unwrap_or(0.0);
        snapshot
    }

    pub fn record_session_started(&self, bpm: f64) {
        self.collector.publish(MetricEvent::SessionStarted {
            bpm,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_session_stopped(&self, round: u32) {
        self.collector.publish(MetricEvent::SessionStopped {
            round,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_resolution(&self, resolution: &Resolution, bpm: f64) {
        self.collector.publish(MetricEvent::UnitResolved {
            note: resolution.note,
            accuracy: resolution.accuracy,
            performance: resolution.performance,
            performance_24: resolution.performance_24,
            bpm,
            error: resolution.error,
            timing: resolution.timing.map(|feedback| feedback.classification),
        });
        if let Some(change) = resolution.tempo_change {
            self.record_tempo_change(change);
        }
    }

    pub fn record_tempo_change(&self, change: TempoChange) {
        self.collector.publish(MetricEvent::TempoChanged {
            bpm: change.bpm,
            reason: change.reason,
        });
    }

    pub fn record_mispress(&self, expected: Option<char>, got: char) {
        self.collector.publish(MetricEvent::Mispress { expected, got });
    }

    pub fn record_overrun(&self, tick: u64, late_ms: f64, coalesced: bool) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut tracker) = self.lateness.lock() {
            tracker.observe(late_ms);
        }
        self.collector.publish(MetricEvent::SchedulerOverrun {
            tick,
            late_ms,
            coalesced,
        });
    }

    pub fn record_awaiting_validation(&self, round: u32) {
        self.collector
            .publish(MetricEvent::RoundAwaitingValidation { round });
    }

    pub fn record_round_flushed(&self, round: u32, rows: usize, persisted: bool) {
        self.collector.publish(MetricEvent::RoundFlushed {
            round,
            rows,
            persisted,
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64, 32)
    }
}

pub(crate) fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::{MetricRow, TempoChangeReason};

    fn resolution(note: i64, error: bool) -> Resolution {
        Resolution {
            note,
            serial: note as u64,
            accuracy: if error { 0.0 } else { 0.9 },
            performance: 0.0,
            performance_24: None,
            error,
            timing: None,
            tempo_change: None,
            row: MetricRow::default(),
        }
    }

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(MetricEvent::RoundAwaitingValidation { round: 1 });
        collector.publish(MetricEvent::RoundAwaitingValidation { round: 2 });
        collector.publish(MetricEvent::Mispress {
            expected: Some('a'),
            got: 'b',
        });

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 3);
        assert!(matches!(
            snapshot.recent[0],
            MetricEvent::RoundAwaitingValidation { round: 1 }
        ));
        assert!(matches!(snapshot.recent[2], MetricEvent::Mispress { .. }));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        for round in 0..3 {
            collector.publish(MetricEvent::RoundAwaitingValidation { round });
        }

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(snapshot.total_events, 3);
        assert!(matches!(
            snapshot.recent[0],
            MetricEvent::RoundAwaitingValidation { round: 1 }
        ));
    }

    #[test]
    fn hub_emits_tempo_change_with_resolution() {
        let hub = TelemetryHub::new(8, 8, 4);
        let mut resolved = resolution(4, true);
        resolved.tempo_change = Some(TempoChange {
            bpm: 79.0,
            reason: TempoChangeReason::Error,
        });
        hub.record_resolution(&resolved, 80.0);

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.total_events, 2);
        assert!(matches!(
            snapshot.recent[0],
            MetricEvent::UnitResolved { note: 4, error: true, .. }
        ));
        assert!(matches!(
            snapshot.recent[1],
            MetricEvent::TempoChanged { reason: TempoChangeReason::Error, .. }
        ));
    }

    #[test]
    fn hub_tracks_overrun_gauge() {
        let hub = TelemetryHub::new(8, 8, 4);
        hub.record_overrun(10, 12.5, true);
        hub.record_overrun(30, -40.0, true);

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.overruns, 2);
        assert_eq!(snapshot.max_late_ms, 40.0);
    }

    #[tokio::test]
    async fn broadcast_subscribers_receive_events() {
        let hub = TelemetryHub::default();
        let mut rx = hub.subscribe();
        hub.record_session_started(80.0);
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, MetricEvent::SessionStarted { bpm, .. } if bpm == 80.0));
    }
}
