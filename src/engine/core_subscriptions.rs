use futures::Stream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use super::{SessionHandle, SessionStatus};
use crate::engine::backend::LiveRow;
use crate::telemetry::{MetricEvent, TelemetrySnapshot};

impl SessionHandle {
    // ========================================================================
    // STREAM SUBSCRIPTIONS
    // ========================================================================

    /// Watch receiver over the most recent resolved row.
    pub fn subscribe_rows(&self) -> watch::Receiver<Option<LiveRow>> {
        self.rows.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Option<SessionStatus>> {
        self.status.subscribe()
    }

    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<MetricEvent> {
        self.telemetry.subscribe()
    }

    /// Telemetry forwarded into an unbounded queue.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn telemetry_receiver(&self) -> mpsc::UnboundedReceiver<MetricEvent> {
        self.telemetry.collector().subscribe_unbounded()
    }

    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    // ========================================================================
    // ASYNC STREAM ADAPTERS
    // ========================================================================

    /// Newest rows as they resolve; rows published faster than the consumer
    /// polls are skipped.
    pub fn row_stream(&self) -> impl Stream<Item = LiveRow> + Unpin + Send + 'static {
        self.rows.stream()
    }

    pub fn status_stream(&self) -> impl Stream<Item = SessionStatus> + Unpin + Send + 'static {
        self.status.stream()
    }

    /// Every telemetry event; lagged gaps are logged and skipped.
    pub fn telemetry_stream(&self) -> impl Stream<Item = MetricEvent> + Unpin + Send + 'static {
        BroadcastStream::new(self.telemetry.subscribe()).filter_map(|event| match event {
            Ok(event) => Some(event),
            Err(err) => {
                log::warn!("[SessionHandle] Telemetry stream lagged: {}", err);
                None
            }
        })
    }
}
