//! TickScheduler - the fixed-rate loop that advances musical time
//!
//! Every tick runs, in this order:
//! 1. the surface refresh hook
//! 2. half-note logic (tick phase 4 of 8): append the due unit, resolve the
//!    previous one, capture round boundaries, flush the round, rotate the window
//! 3. the latency-compensated metronome click
//! 4. note onset logic (tick phase 0): advance to the next unit and stamp it
//!
//! The scheduler never sleeps or blocks. Callers poll it with the current
//! time; it decides whether a tick is due. Times are seconds since session
//! start.

pub mod click;
pub mod round;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::clock::SessionClock;
use crate::config::{AppConfig, TrainingMode};
use crate::engine::backend::{ClickEmitter, LiveRow, MetricSink, RefreshHook};
use crate::engine::ParamPatch;
use crate::error::log_session_error;
use crate::input::{InputResolver, Keystroke, KeystrokeOutcome, PressTarget};
use crate::performance::{PerformanceTracker, TempoChange, TempoChangeReason};
use crate::rhythm::{CharacterFeed, PatternSource, RhythmicUnit, UnitWindow, PATTERN_LEN};
use crate::telemetry::{now_timestamp_ms, TelemetryHub};

pub use click::{click_phase, compensation_factor, should_click};
pub use round::{RoundExport, RoundOutcome, RoundPhase, RoundVerdict};

use round::PendingRound;

/// Channel the metronome click is played on.
const CLICK_CHANNEL: u8 = 0;

/// Result of one [`TickScheduler::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No tick due yet
    Idle,
    /// One tick fired on schedule
    Ticked,
    /// The loop fell behind; one tick fired and the schedule was re-anchored
    Coalesced,
    /// A finished round awaits a verdict; time does not advance
    Paused,
}

/// Core orchestrator of a training session.
pub struct TickScheduler<P: PatternSource, S: MetricSink, C: ClickEmitter> {
    config: AppConfig,
    clock: SessionClock,
    library: P,
    window: UnitWindow,
    feed: CharacterFeed,
    tracker: PerformanceTracker,
    input: InputResolver,
    sink: S,
    click: C,
    refresh: Option<Box<dyn RefreshHook>>,
    telemetry: Arc<TelemetryHub>,
    pending: Option<PendingRound>,
    outcomes: Vec<RoundOutcome>,
    round: u32,
    round_start: f64,
    next_round_start: f64,
    /// Session time tick `anchor_tick` is due at. Later deadlines are
    /// `anchor + n × anchor_interval`, never accumulated.
    anchor: f64,
    anchor_tick: u64,
    anchor_interval: f64,
    overruns: u64,
}

impl<P: PatternSource, S: MetricSink, C: ClickEmitter> TickScheduler<P, S, C> {
    /// Create a scheduler positioned at the start of the count-in.
    ///
    /// # Arguments
    /// * `config` - Session configuration
    /// * `initial_bpm` - Starting tempo, clamped into the mode's bounds
    /// * `library` - Pattern source; its current window backs the first units
    /// * `sink` - Destination for rows and validated rounds
    /// * `click` - Metronome output
    /// * `telemetry` - Hub receiving session events
    pub fn new(
        config: AppConfig,
        initial_bpm: f64,
        library: P,
        sink: S,
        click: C,
        telemetry: Arc<TelemetryHub>,
    ) -> Self {
        let clock = SessionClock::new(
            initial_bpm,
            config.tempo.min_bpm,
            config.effective_max_bpm(),
            config.tempo.subdivisions,
        );
        let mut feed = CharacterFeed::new(&config.session.practice_text);
        let window = UnitWindow::build(&library, &mut feed);
        let tracker = PerformanceTracker::new(&config);
        let anchor_interval = clock.tick_interval();

        log::info!(
            "[TickScheduler] Created: mode={:?}, day={:?}, bpm={}",
            config.session.mode,
            config.session.day,
            clock.bpm()
        );

        Self {
            config,
            clock,
            library,
            window,
            feed,
            tracker,
            input: InputResolver::new(),
            sink,
            click,
            refresh: None,
            telemetry,
            pending: None,
            outcomes: Vec::new(),
            round: 1,
            round_start: 0.0,
            next_round_start: 0.0,
            anchor: 0.0,
            anchor_tick: 0,
            anchor_interval,
            overruns: 0,
        }
    }

    /// Install the refresh hook run at the start of every tick.
    pub fn with_refresh_hook(mut self, hook: Box<dyn RefreshHook>) -> Self {
        self.refresh = Some(hook);
        self
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn library(&self) -> &P {
        &self.library
    }

    pub fn window(&self) -> &UnitWindow {
        &self.window
    }

    pub fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    pub fn input(&self) -> &InputResolver {
        &self.input
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn click(&self) -> &C {
        &self.click
    }

    pub fn telemetry(&self) -> &Arc<TelemetryHub> {
        &self.telemetry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Number of the round currently being played (starts at 1).
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Rounds settled so far, oldest first.
    pub fn outcomes(&self) -> &[RoundOutcome] {
        &self.outcomes
    }

    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    pub fn phase(&self) -> RoundPhase {
        if self.pending.is_some() {
            RoundPhase::AwaitingValidation
        } else if self.clock.note() < 0 {
            RoundPhase::PreRound
        } else {
            RoundPhase::Active
        }
    }

    /// Round start captured for the round in progress.
    pub fn round_start(&self) -> f64 {
        self.round_start
    }

    /// Time the next tick is due; `None` while a round awaits its verdict.
    ///
    /// Tick 0 is due at session time 0.0.
    pub fn next_deadline(&self) -> Option<f64> {
        if self.pending.is_some() {
            return None;
        }
        Some(self.deadline())
    }

    fn deadline(&self) -> f64 {
        let since_anchor = self.clock.ticks() - self.anchor_tick;
        self.anchor + since_anchor as f64 * self.anchor_interval
    }

    /// Make the next tick due at `at` and grid later ticks from there.
    fn reanchor(&mut self, at: f64) {
        self.anchor = at;
        self.anchor_tick = self.clock.ticks();
        self.anchor_interval = self.clock.tick_interval();
    }

    /// Re-grid after a tempo change: the next tick follows the last fired one
    /// by the new interval.
    fn follow_tempo(&mut self) {
        let interval = self.clock.tick_interval();
        if interval == self.anchor_interval {
            return;
        }
        if self.clock.ticks() == 0 {
            self.anchor_interval = interval;
            return;
        }
        let last_fired = self.deadline() - self.anchor_interval;
        self.reanchor(last_fired + interval);
    }

    /// The unit a keystroke on the due character would be stamped on.
    pub fn due_unit(&self) -> Option<&RhythmicUnit> {
        if self.input.due_appended() {
            self.tracker.latest()
        } else {
            self.window.get(self.input.due_slot())
        }
    }

    /// The early-pressable unit after the due one, if any.
    pub fn next_unit(&self) -> Option<&RhythmicUnit> {
        if self.input.has_next() {
            self.window.get(self.input.next_slot())
        } else {
            None
        }
    }

    // ========================================================================
    // TIMING LOOP
    // ========================================================================

    /// Fire a tick if one is due at `now`.
    ///
    /// Tick 0 is due at 0.0 and tick `n` at `anchor + n × interval`. If `now`
    /// lies `overrun_factor` intervals or more past the previous tick, a single
    /// tick fires and the schedule restarts from `now`.
    pub fn poll(&mut self, now: f64) -> TickOutcome {
        if self.pending.is_some() {
            return TickOutcome::Paused;
        }

        let interval = self.anchor_interval;
        let deadline = self.deadline();
        if now < deadline {
            return TickOutcome::Idle;
        }
        let elapsed = now - (deadline - interval);

        if self.clock.ticks() > 0 && elapsed >= self.config.scheduler.overrun_factor * interval {
            let late_ms = (now - deadline) * 1000.0;
            self.overruns += 1;
            log::warn!(
                "[TickScheduler] Overrun at tick {}: {:.2} ms late, coalescing",
                self.clock.ticks(),
                late_ms
            );
            self.telemetry
                .record_overrun(self.clock.ticks(), late_ms, true);
            self.tick(now);
            self.reanchor(now + self.clock.tick_interval());
            return TickOutcome::Coalesced;
        }

        self.tick(now);
        self.follow_tempo();
        TickOutcome::Ticked
    }

    fn tick(&mut self, now: f64) {
        if let Some(hook) = self.refresh.as_mut() {
            hook.refresh(&self.clock);
        }

        let subdivisions = self.clock.subdivisions();
        let phase = self.clock.tick_phase();
        let note = self.clock.note();

        if phase == (subdivisions / 2) as u64 && note >= -1 {
            self.half_note(note, now);
        }

        if should_click(phase, self.clock.bpm(), subdivisions) {
            self.click.play_click(CLICK_CHANNEL);
        }

        if phase == 0 {
            self.onset(now);
        }

        log::trace!(
            "[TickScheduler] tick={} phase={} note={} bpm={}",
            self.clock.ticks(),
            phase,
            self.clock.note(),
            self.clock.bpm()
        );
        self.clock.advance_tick();
    }

    fn half_note(&mut self, note: i64, now: f64) {
        let round_length = self.config.round.length as i64;

        if note < 0 {
            let serial = self.window.allocate_serial();
            self.tracker.append(RhythmicUnit::lead(serial));
        } else {
            let due_slot = self.input.due_slot();
            let next_sounding = self
                .window
                .get(due_slot + 1)
                .map_or(false, |unit| !unit.kind.is_silence());
            self.input.on_half_note(next_sounding);
            if let Some(unit) = self.window.get(due_slot) {
                self.tracker.append(unit.clone());
            }
        }

        if note.rem_euclid(round_length) == round_length - 1 {
            self.next_round_start = now;
        }
        if note % round_length == self.config.round.start_capture_offset as i64 {
            self.round_start = self.next_round_start;
        }

        if note >= 1 {
            if let Some(resolution) = self.tracker.resolve_previous(&mut self.clock, note - 1) {
                self.telemetry.record_resolution(&resolution, self.clock.bpm());
                self.sink.publish_row(LiveRow {
                    round: self.round,
                    note: resolution.note,
                    bpm: self.clock.bpm(),
                    row: resolution.row,
                });
            }
        }

        let flush_offset = self.config.round.flush_offset as i64;
        if note % round_length == flush_offset && note > flush_offset {
            self.flush_round(now);
        }

        if note >= 0 && note % PATTERN_LEN as i64 == PATTERN_LEN as i64 - 1 {
            self.library.advance_window();
            self.window.rotate(&self.library, &mut self.feed);
            self.input.on_window_rotated();
        }
    }

    fn onset(&mut self, now: f64) {
        self.input.on_onset(self.clock.note() >= 0);
        self.clock.advance_note();
        if self.clock.note() < 0 {
            return;
        }

        let slot = self.input.due_slot();
        let runit_bpm = self.clock.normalized_bpm();
        let pattern = self.library.current_pattern();
        if let Some(unit) = self.window.get_mut(slot) {
            unit.activate(now, runit_bpm, pattern, slot);
        }
    }

    // ========================================================================
    // ROUND BOUNDARIES
    // ========================================================================

    fn flush_round(&mut self, now: f64) {
        let rows = self.tracker.flush_round(self.round_start, now);
        self.clock
            .rewind_note_to(self.config.round.flush_offset as i64);

        let finished = self.round;
        self.round += 1;

        if self.config.session.mode == TrainingMode::Evaluation {
            self.clock.reset_bpm(self.config.tempo.initial_bpm);
            self.telemetry.record_tempo_change(TempoChange {
                bpm: self.clock.bpm(),
                reason: TempoChangeReason::RoundReset,
            });
        }

        let export = RoundExport {
            round: finished,
            pseudonym: self.config.session.pseudonym.clone(),
            mode: self.config.session.mode,
            day: self.config.session.day,
            started_unix_ms: now_timestamp_ms(),
            rows,
        };

        tracing::info!(
            round = finished,
            rows = export.rows.len(),
            auto_validate = self.config.session.auto_validate,
            "[TickScheduler] Round finished"
        );

        if self.config.session.auto_validate {
            self.settle(export, RoundVerdict::Accept);
        } else {
            self.telemetry.record_awaiting_validation(finished);
            self.pending = Some(PendingRound {
                export,
                parked_at: now,
            });
        }
    }

    /// Settle the round waiting for validation and resume ticking from `now`.
    ///
    /// # Returns
    /// `None` when no round is waiting
    pub fn submit_verdict(&mut self, verdict: RoundVerdict, now: f64) -> Option<RoundOutcome> {
        let Some(pending) = self.pending.take() else {
            log::warn!("[TickScheduler] Verdict {:?} with no round pending", verdict);
            return None;
        };

        log::debug!(
            "[TickScheduler] Round {} validated after {:.1}s",
            pending.export.round,
            now - pending.parked_at
        );
        let outcome = self.settle(pending.export, verdict);
        self.reanchor(now + self.clock.tick_interval());
        Some(outcome)
    }

    fn settle(&mut self, export: RoundExport, verdict: RoundVerdict) -> RoundOutcome {
        let round = export.round;
        let rows = export.rows.len();

        let persisted = if verdict.persists() {
            match self.sink.persist_round(export) {
                Ok(()) => true,
                Err(err) => {
                    log_session_error(&err, "TickScheduler::settle");
                    false
                }
            }
        } else {
            tracing::warn!(round, ?verdict, "[TickScheduler] Round discarded");
            false
        };

        tracing::debug!(round, rows, persisted, "[TickScheduler] Round settled");
        self.telemetry.record_round_flushed(round, rows, persisted);
        let outcome = RoundOutcome {
            round,
            rows,
            persisted,
        };
        self.outcomes.push(outcome);
        outcome
    }

    // ========================================================================
    // INPUT AND PARAMETERS
    // ========================================================================

    /// Apply a keystroke to the due or next unit.
    pub fn handle_keystroke(&mut self, keystroke: Keystroke) -> KeystrokeOutcome {
        if self.pending.is_some() || self.clock.note() < -1 {
            return KeystrokeOutcome::Ignored;
        }

        let character = keystroke.character;
        let target = self
            .input
            .target(character, self.due_unit(), self.next_unit());

        match target {
            PressTarget::Next => {
                if let Some(unit) = self.window.get_mut(self.input.next_slot()) {
                    unit.press(keystroke.instant);
                }
                KeystrokeOutcome::MatchedNext
            }
            PressTarget::Due => {
                if let Some(unit) = self.due_unit_mut() {
                    unit.press(keystroke.instant);
                }
                KeystrokeOutcome::MatchedDue
            }
            PressTarget::Duplicate => {
                log::debug!("[TickScheduler] Duplicate press of {:?}", character);
                KeystrokeOutcome::Duplicate
            }
            PressTarget::Mispress { expected } => {
                if let Some(unit) = self.due_unit_mut() {
                    if unit.expects_press() {
                        unit.error = true;
                    }
                }
                log::warn!(
                    "[TickScheduler] Mispress: expected {:?}, got {:?}",
                    expected,
                    character
                );
                self.telemetry.record_mispress(expected, character);
                KeystrokeOutcome::Mispress { expected }
            }
        }
    }

    fn due_unit_mut(&mut self) -> Option<&mut RhythmicUnit> {
        if self.input.due_appended() {
            self.tracker.latest_mut()
        } else {
            self.window.get_mut(self.input.due_slot())
        }
    }

    /// Apply player parameter adjustments.
    ///
    /// Ignored in evaluation mode. Out-of-range requests are dropped silently.
    ///
    /// # Returns
    /// Whether any part of the patch changed state
    pub fn apply_patch(&mut self, patch: &ParamPatch) -> bool {
        if self.config.session.mode == TrainingMode::Evaluation {
            log::debug!("[TickScheduler] Parameter patch ignored in evaluation mode");
            return false;
        }

        let mut changed = false;
        let controller = self.tracker.controller_mut();
        if let Some(delta) = patch.frequency_delta {
            changed |= controller.adjust_frequency(delta);
        }
        if let Some(delta) = patch.step_delta {
            changed |= controller.adjust_step(delta);
        }
        if let Some(direction) = patch.bpm_delta {
            if let Some(change) = self.tracker.controller().nudge(&mut self.clock, direction) {
                self.telemetry.record_tempo_change(change);
                self.follow_tempo();
                changed = true;
            }
        }
        changed
    }
}
