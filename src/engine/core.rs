//! SessionHandle: threaded runtime owning the tick scheduler.
//!
//! The handle is the only surface callers touch. It spawns one scheduler
//! thread per session and talks to it exclusively through channels:
//! keystrokes over a lock-free ring, parameter patches and round verdicts over
//! bounded mpsc queues, rows and status back through latest-value channels,
//! and telemetry through the shared broadcast hub.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rtrb::{Consumer, Producer, RingBuffer};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::{AppConfig, TrainingMode};
use crate::engine::backend::{
    ClickEmitter, LiveRow, LogClickEmitter, MetricSink, RoundFileWriter, SystemTimeSource,
    TimeSource,
};
use crate::error::{log_session_error, SessionError};
use crate::input::Keystroke;
use crate::managers::{CalibrationManager, LatestValueChannel};
use crate::rhythm::{DaySchedule, PatternLibrary};
use crate::scheduler::{RoundExport, RoundPhase, RoundVerdict, TickOutcome, TickScheduler};
use crate::telemetry::TelemetryHub;

#[path = "core_subscriptions.rs"]
mod core_subscriptions;

/// Longest the loop sleeps before re-checking shutdown and input.
const MAX_SLEEP: Duration = Duration::from_millis(5);

/// Patch describing player parameter adjustments for the running session.
///
/// Deltas are applied with saturation; `bpm_delta` only contributes its sign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamPatch {
    #[serde(default)]
    pub frequency_delta: Option<i32>,
    #[serde(default)]
    pub step_delta: Option<i32>,
    #[serde(default)]
    pub bpm_delta: Option<i32>,
}

/// Snapshot of the scheduler published after every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionStatus {
    pub round: u32,
    pub note: i64,
    pub bpm: f64,
    pub phase: RoundPhase,
    pub ticks: u64,
    pub overruns: u64,
}

impl SessionStatus {
    fn capture<C: ClickEmitter>(scheduler: &TickScheduler<PatternLibrary, SessionSink, C>) -> Self {
        Self {
            round: scheduler.round(),
            note: scheduler.clock().note(),
            bpm: scheduler.clock().bpm(),
            phase: scheduler.phase(),
            ticks: scheduler.clock().ticks(),
            overruns: scheduler.overruns(),
        }
    }
}

/// Sink wiring live rows to the latest-value channel and rounds to disk.
struct SessionSink {
    rows: LatestValueChannel<LiveRow>,
    writer: RoundFileWriter,
}

impl MetricSink for SessionSink {
    fn publish_row(&mut self, row: LiveRow) {
        self.rows.publish(row);
    }

    fn persist_round(&mut self, export: RoundExport) -> Result<(), SessionError> {
        self.writer.persist_round(export)
    }
}

/// Caller-side ends of the channels into a running scheduler thread.
struct SessionRuntime {
    keystrokes: Producer<Keystroke>,
    keystroke_capacity: usize,
    patch_tx: mpsc::Sender<ParamPatch>,
    verdict_tx: mpsc::Sender<RoundVerdict>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    epoch: Instant,
}

/// Scheduler-side ends.
struct LoopChannels {
    keystrokes: Consumer<Keystroke>,
    patches: mpsc::Receiver<ParamPatch>,
    verdicts: mpsc::Receiver<RoundVerdict>,
}

/// SessionHandle starts, feeds and stops training sessions.
pub struct SessionHandle {
    config: AppConfig,
    time_source: Arc<dyn TimeSource>,
    telemetry: Arc<TelemetryHub>,
    rows: LatestValueChannel<LiveRow>,
    status: LatestValueChannel<SessionStatus>,
    calibration: CalibrationManager,
    runtime: Mutex<Option<SessionRuntime>>,
}

impl SessionHandle {
    /// Create a handle using the wall clock.
    pub fn new(config: AppConfig) -> Self {
        Self::with_time_source(config, Arc::new(SystemTimeSource::default()))
    }

    /// Create a handle reading time from `time_source`.
    pub fn with_time_source(config: AppConfig, time_source: Arc<dyn TimeSource>) -> Self {
        let calibration = CalibrationManager::new(config.tempo.clone());
        Self {
            config,
            time_source,
            telemetry: Arc::new(TelemetryHub::default()),
            rows: LatestValueChannel::new(),
            status: LatestValueChannel::new(),
            calibration,
            runtime: Mutex::new(None),
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Start a session.
    ///
    /// Training sessions start at `initial_bpm`, else the calibrated tempo,
    /// else the configured default. Evaluation sessions always start at the
    /// configured default.
    ///
    /// # Returns
    /// The starting bpm
    ///
    /// # Errors
    /// - `AlreadyRunning` if a session is active
    /// - `InvalidBpm` for a non-finite or out-of-bounds starting tempo
    /// - `PatternSchedule` if the day schedule does not validate
    /// - `Io` if the writer or scheduler thread cannot be spawned
    pub fn start(&self, initial_bpm: Option<f64>) -> Result<f64, SessionError> {
        let mut runtime = self.lock_runtime()?;
        if runtime.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let bpm = self.starting_bpm(initial_bpm)?;
        let schedule = DaySchedule::for_session(self.config.session.mode, self.config.session.day);
        let library = PatternLibrary::new(schedule, self.config.session.rng_seed)
            .inspect_err(|err| log::error!("[SessionHandle] Pattern schedule rejected: {}", err))?;
        let writer = RoundFileWriter::spawn(&self.config.session.output_dir)?;

        let sink = SessionSink {
            rows: self.rows.clone(),
            writer,
        };
        let scheduler = TickScheduler::new(
            self.config.clone(),
            bpm,
            library,
            sink,
            LogClickEmitter::new(),
            Arc::clone(&self.telemetry),
        );

        let capacity = self.config.scheduler.keystroke_queue_capacity.max(1);
        let (keystrokes, keystroke_rx) = RingBuffer::new(capacity);
        let queue = self.config.scheduler.command_queue_capacity.max(1);
        let (patch_tx, patches) = mpsc::channel(queue);
        let (verdict_tx, verdicts) = mpsc::channel(queue);
        let shutdown = Arc::new(AtomicBool::new(false));
        let epoch = self.time_source.now();

        let channels = LoopChannels {
            keystrokes: keystroke_rx,
            patches,
            verdicts,
        };
        let context = LoopContext {
            shutdown: Arc::clone(&shutdown),
            time_source: Arc::clone(&self.time_source),
            epoch,
            status: self.status.clone(),
            spin_margin: Duration::from_micros(self.config.scheduler.spin_margin_us),
        };

        self.rows.clear();
        self.status.publish(SessionStatus::capture(&scheduler));
        self.telemetry.record_session_started(bpm);
        let thread = std::thread::Builder::new()
            .name("tick-scheduler".to_string())
            .spawn(move || run_scheduler_loop(scheduler, channels, context))?;

        *runtime = Some(SessionRuntime {
            keystrokes,
            keystroke_capacity: capacity,
            patch_tx,
            verdict_tx,
            shutdown,
            thread: Some(thread),
            epoch,
        });

        log::info!(
            "[SessionHandle] Session started: mode={:?}, day={:?}, bpm={}",
            self.config.session.mode,
            self.config.session.day,
            bpm
        );
        Ok(bpm)
    }

    /// Stop the running session and wait for the scheduler thread.
    ///
    /// Validated rounds still queued for writing are flushed before return.
    pub fn stop(&self) -> Result<(), SessionError> {
        let mut runtime = self
            .lock_runtime()?
            .take()
            .ok_or(SessionError::NotRunning)?;

        runtime.shutdown.store(true, Ordering::Release);
        if let Some(thread) = runtime.thread.take() {
            if thread.join().is_err() {
                log::error!("[SessionHandle] Scheduler thread panicked");
            }
        }
        log::info!("[SessionHandle] Session stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.lock_runtime().map(|rt| rt.is_some()).unwrap_or(false)
    }

    fn starting_bpm(&self, requested: Option<f64>) -> Result<f64, SessionError> {
        let bpm = match self.config.session.mode {
            TrainingMode::Evaluation => {
                if let Some(bpm) = requested {
                    log::debug!(
                        "[SessionHandle] Requested {} bpm ignored in evaluation mode",
                        bpm
                    );
                }
                self.config.tempo.initial_bpm
            }
            TrainingMode::Training => requested
                .or_else(|| self.calibration.result().map(|result| result.bpm))
                .unwrap_or(self.config.tempo.initial_bpm),
        };

        if !bpm.is_finite()
            || bpm < self.config.tempo.min_bpm
            || bpm > self.config.effective_max_bpm()
        {
            let err = SessionError::InvalidBpm { bpm };
            log_session_error(&err, "SessionHandle::start");
            return Err(err);
        }
        Ok(bpm)
    }

    // ========================================================================
    // INPUT AND COMMANDS
    // ========================================================================

    /// Send a keystroke stamped with the current session time.
    pub fn press(&self, character: char) -> Result<(), SessionError> {
        let mut runtime = self.lock_runtime()?;
        let runtime = runtime.as_mut().ok_or(SessionError::NotRunning)?;
        let instant = self
            .time_source
            .now()
            .saturating_duration_since(runtime.epoch)
            .as_secs_f64();
        push_keystroke(runtime, Keystroke { character, instant })
    }

    /// Send a keystroke whose session-time instant was captured elsewhere.
    pub fn press_at(&self, keystroke: Keystroke) -> Result<(), SessionError> {
        let mut runtime = self.lock_runtime()?;
        let runtime = runtime.as_mut().ok_or(SessionError::NotRunning)?;
        push_keystroke(runtime, keystroke)
    }

    /// Queue a parameter patch for the next loop iteration.
    pub fn apply_patch(&self, patch: ParamPatch) -> Result<(), SessionError> {
        let runtime = self.lock_runtime()?;
        let runtime = runtime.as_ref().ok_or(SessionError::NotRunning)?;
        runtime.patch_tx.try_send(patch).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SessionError::InputQueueFull {
                capacity: self.config.scheduler.command_queue_capacity,
            },
            mpsc::error::TrySendError::Closed(_) => SessionError::ChannelClosed {
                channel: "param_patch".to_string(),
            },
        })
    }

    /// Settle the round awaiting validation.
    pub fn submit_verdict(&self, verdict: RoundVerdict) -> Result<(), SessionError> {
        let runtime = self.lock_runtime()?;
        let runtime = runtime.as_ref().ok_or(SessionError::NotRunning)?;
        runtime.verdict_tx.try_send(verdict).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SessionError::InputQueueFull {
                capacity: self.config.scheduler.command_queue_capacity,
            },
            mpsc::error::TrySendError::Closed(_) => SessionError::ChannelClosed {
                channel: "round_verdict".to_string(),
            },
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &Arc<TelemetryHub> {
        &self.telemetry
    }

    /// Typing-test calibration feeding the starting tempo of training sessions.
    pub fn calibration(&self) -> &CalibrationManager {
        &self.calibration
    }

    /// Most recently resolved row of the running session.
    pub fn latest_row(&self) -> Option<LiveRow> {
        self.rows.latest()
    }

    /// Scheduler status after the most recent tick.
    pub fn status(&self) -> Option<SessionStatus> {
        self.status.latest()
    }

    /// Seconds since the running session started.
    pub fn session_time(&self) -> Result<f64, SessionError> {
        let runtime = self.lock_runtime()?;
        let runtime = runtime.as_ref().ok_or(SessionError::NotRunning)?;
        Ok(self
            .time_source
            .now()
            .saturating_duration_since(runtime.epoch)
            .as_secs_f64())
    }

    fn lock_runtime(&self) -> Result<MutexGuard<'_, Option<SessionRuntime>>, SessionError> {
        self.runtime.lock().map_err(|_| SessionError::LockPoisoned {
            component: "session_runtime".to_string(),
        })
    }
}

fn push_keystroke(runtime: &mut SessionRuntime, keystroke: Keystroke) -> Result<(), SessionError> {
    let capacity = runtime.keystroke_capacity;
    runtime
        .keystrokes
        .push(keystroke)
        .map_err(|_| SessionError::InputQueueFull { capacity })
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                log_session_error(&err, "SessionHandle::drop");
            }
        }
    }
}

// ========================================================================
// SCHEDULER THREAD
// ========================================================================

struct LoopContext {
    shutdown: Arc<AtomicBool>,
    time_source: Arc<dyn TimeSource>,
    epoch: Instant,
    status: LatestValueChannel<SessionStatus>,
    spin_margin: Duration,
}

impl LoopContext {
    fn now(&self) -> f64 {
        self.time_source
            .now()
            .saturating_duration_since(self.epoch)
            .as_secs_f64()
    }
}

fn run_scheduler_loop<C: ClickEmitter>(
    mut scheduler: TickScheduler<PatternLibrary, SessionSink, C>,
    mut channels: LoopChannels,
    context: LoopContext,
) {
    let _span = tracing::info_span!("tick_scheduler").entered();
    tracing::info!(
        bpm = scheduler.clock().bpm(),
        "[TickScheduler] Loop started"
    );

    while !context.shutdown.load(Ordering::Acquire) {
        let now = context.now();
        let mut changed = false;

        while let Ok(keystroke) = channels.keystrokes.pop() {
            let outcome = scheduler.handle_keystroke(keystroke);
            log::trace!(
                "[TickScheduler] Keystroke {:?} at {:.4}s -> {:?}",
                keystroke.character,
                keystroke.instant,
                outcome
            );
        }
        while let Ok(patch) = channels.patches.try_recv() {
            changed |= scheduler.apply_patch(&patch);
        }
        while let Ok(verdict) = channels.verdicts.try_recv() {
            changed |= scheduler.submit_verdict(verdict, now).is_some();
        }

        match scheduler.poll(now) {
            TickOutcome::Ticked | TickOutcome::Coalesced => changed = true,
            TickOutcome::Idle | TickOutcome::Paused => {}
        }
        if changed {
            context.status.publish(SessionStatus::capture(&scheduler));
        }

        wait_for_deadline(scheduler.next_deadline(), &context);
    }

    scheduler.telemetry().record_session_stopped(scheduler.round());
    tracing::info!(
        round = scheduler.round(),
        ticks = scheduler.clock().ticks(),
        overruns = scheduler.overruns(),
        "[TickScheduler] Loop stopped"
    );
}

/// Sleep until shortly before `deadline`, then let the loop poll.
fn wait_for_deadline(deadline: Option<f64>, context: &LoopContext) {
    let Some(deadline) = deadline else {
        std::thread::sleep(Duration::from_millis(1));
        return;
    };

    let remaining = deadline - context.now();
    let margin = context.spin_margin.as_secs_f64();
    if remaining > margin {
        let sleep = Duration::from_secs_f64(remaining - margin).min(MAX_SLEEP);
        std::thread::sleep(sleep);
    } else if remaining > 0.0 {
        std::hint::spin_loop();
    }
}
