//! Virtual-time session runner.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{AppConfig, TrainingMode};
use crate::engine::backend::{write_round_file, LogClickEmitter, MemoryMetricSink};
use crate::error::{log_session_error, SessionError};
use crate::input::KeystrokeOutcome;
use crate::rhythm::{DaySchedule, PatternLibrary};
use crate::scheduler::{RoundPhase, RoundVerdict, TickOutcome, TickScheduler};
use crate::telemetry::TelemetryHub;

use super::player::{PlayerProfile, SimulatedPlayer};

type SimScheduler = TickScheduler<PatternLibrary, MemoryMetricSink, LogClickEmitter>;

/// What to simulate.
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Rounds to settle before stopping
    pub rounds: u32,
    /// Starting tempo for training mode; evaluation always uses the default
    pub initial_bpm: Option<f64>,
    pub player: PlayerProfile,
    /// Verdict given whenever a round waits for validation
    pub verdict: RoundVerdict,
    /// Write accepted rounds here once the run ends
    pub output_dir: Option<PathBuf>,
    /// Hard stop; defaults to enough ticks for the requested rounds
    pub max_ticks: Option<u64>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            rounds: 1,
            initial_bpm: None,
            player: PlayerProfile::default(),
            verdict: RoundVerdict::Accept,
            output_dir: None,
            max_ticks: None,
        }
    }
}

/// One settled round of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    pub round: u32,
    pub rows: usize,
    pub persisted: bool,
    pub path: Option<PathBuf>,
}

/// Result of [`SimulationDriver::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub rounds_completed: u32,
    pub units_resolved: u64,
    pub final_bpm: f64,
    pub peak_bpm: f64,
    pub mean_accuracy: f64,
    pub successes: u64,
    pub errors: u64,
    pub mispresses: u64,
    pub ticks: u64,
    /// Virtual seconds simulated
    pub duration_secs: f64,
    pub exports: Vec<ExportSummary>,
}

/// Runs a [`TickScheduler`] against a [`SimulatedPlayer`] on virtual time.
///
/// Every step jumps straight to the next tick deadline, delivering the
/// player's keystrokes that fall before it first.
pub struct SimulationDriver {
    scheduler: SimScheduler,
    player: SimulatedPlayer,
    options: SimulationOptions,
    now: f64,
    mispresses: u64,
}

impl SimulationDriver {
    /// Build the pattern library and scheduler for `config`.
    ///
    /// # Errors
    /// - `InvalidBpm` for an unusable starting tempo
    /// - `PatternSchedule` if the day schedule does not validate
    pub fn new(config: AppConfig, options: SimulationOptions) -> Result<Self, SessionError> {
        let bpm = match config.session.mode {
            TrainingMode::Evaluation => config.tempo.initial_bpm,
            TrainingMode::Training => options.initial_bpm.unwrap_or(config.tempo.initial_bpm),
        };
        if !bpm.is_finite() || bpm < config.tempo.min_bpm || bpm > config.effective_max_bpm() {
            return Err(SessionError::InvalidBpm { bpm });
        }

        let schedule = DaySchedule::for_session(config.session.mode, config.session.day);
        let library = PatternLibrary::new(schedule, config.session.rng_seed)?;
        let scheduler = TickScheduler::new(
            config,
            bpm,
            library,
            MemoryMetricSink::new(),
            LogClickEmitter::new(),
            Arc::new(TelemetryHub::default()),
        );

        Ok(Self {
            scheduler,
            player: SimulatedPlayer::new(options.player),
            options,
            now: 0.0,
            mispresses: 0,
        })
    }

    pub fn scheduler(&self) -> &SimScheduler {
        &self.scheduler
    }

    pub fn player(&self) -> &SimulatedPlayer {
        &self.player
    }

    /// Virtual session time, seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Advance to the next tick deadline and fire it.
    pub fn step(&mut self) -> TickOutcome {
        if self.scheduler.phase() == RoundPhase::AwaitingValidation {
            self.scheduler.submit_verdict(self.options.verdict, self.now);
        }

        let deadline = self.scheduler.next_deadline().unwrap_or(self.now);
        for keystroke in self.player.take_before(deadline) {
            let outcome = self.scheduler.handle_keystroke(keystroke);
            if matches!(outcome, KeystrokeOutcome::Mispress { .. }) {
                self.mispresses += 1;
            }
        }

        self.now = deadline;
        let outcome = self.scheduler.poll(self.now);
        self.observe();
        outcome
    }

    /// Let the player plan presses for the units that just became pressable.
    fn observe(&mut self) {
        let clock = self.scheduler.clock();
        if clock.note() < 0 {
            return;
        }

        if let Some(due) = self.scheduler.due_unit() {
            self.player.plan(due, due.time_to_press, self.now);
        }
        if let (Some(next), Some(deadline)) =
            (self.scheduler.next_unit(), self.scheduler.next_deadline())
        {
            let subdivisions = clock.subdivisions() as u64;
            let ticks_to_onset = (subdivisions - clock.tick_phase()) % subdivisions;
            let onset = deadline + ticks_to_onset as f64 * clock.tick_interval();
            self.player.plan(next, onset, self.now);
        }
    }

    fn tick_budget(&self) -> u64 {
        let config = self.scheduler.config();
        let notes = (self.options.rounds as u64 + 1) * config.round.length as u64 + 16;
        notes * config.tempo.subdivisions as u64
    }

    /// Run until the requested rounds are settled or the tick budget is spent.
    ///
    /// # Errors
    /// `Io` if writing an accepted round to `output_dir` fails
    pub fn run(&mut self) -> Result<SimulationSummary, SessionError> {
        let budget = self.options.max_ticks.unwrap_or_else(|| self.tick_budget());
        while (self.scheduler.outcomes().len() as u32) < self.options.rounds
            && self.scheduler.clock().ticks() < budget
        {
            self.step();
        }

        if (self.scheduler.outcomes().len() as u32) < self.options.rounds {
            log::warn!(
                "[SimulationDriver] Tick budget {} spent after {} of {} rounds",
                budget,
                self.scheduler.outcomes().len(),
                self.options.rounds
            );
        }

        let exports = self.write_exports()?;
        Ok(self.summary(exports))
    }

    fn write_exports(&self) -> Result<Vec<ExportSummary>, SessionError> {
        let mut summaries = Vec::new();
        for outcome in self.scheduler.outcomes() {
            let export = self
                .scheduler
                .sink()
                .exports()
                .iter()
                .find(|export| export.round == outcome.round);
            let path = match (&self.options.output_dir, export) {
                (Some(dir), Some(export)) => Some(write_round_file(dir, export).inspect_err(
                    |err| log_session_error(err, "SimulationDriver::write_exports"),
                )?),
                _ => None,
            };
            summaries.push(ExportSummary {
                round: outcome.round,
                rows: outcome.rows,
                persisted: outcome.persisted,
                path,
            });
        }
        Ok(summaries)
    }

    /// Summary of the run so far.
    pub fn summary(&self, exports: Vec<ExportSummary>) -> SimulationSummary {
        let tracker = self.scheduler.tracker();
        let stats = tracker.stats();
        SimulationSummary {
            rounds_completed: self.scheduler.outcomes().len() as u32,
            units_resolved: stats.resolved,
            final_bpm: self.scheduler.clock().bpm(),
            peak_bpm: tracker.peak_bpm(),
            mean_accuracy: stats.mean_accuracy(),
            successes: stats.successes,
            errors: stats.errors,
            mispresses: self.mispresses,
            ticks: self.scheduler.clock().ticks(),
            duration_secs: self.now,
            exports,
        }
    }
}
