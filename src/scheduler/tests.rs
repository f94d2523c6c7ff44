use std::sync::Arc;

use super::*;
use crate::config::TrainingDay;
use crate::engine::backend::{LogClickEmitter, MemoryMetricSink};
use crate::rhythm::{DaySchedule, PatternLibrary};
use crate::telemetry::MetricEvent;

type TestScheduler = TickScheduler<PatternLibrary, MemoryMetricSink, LogClickEmitter>;

/// Ticks from session start to the onset of note 0.
const COUNT_IN_TICKS: u64 = 32;

fn config(mode: TrainingMode, auto_validate: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.session.mode = mode;
    config.session.day = TrainingDay::One;
    config.session.auto_validate = auto_validate;
    config.session.rng_seed = Some(3);
    config.session.practice_text = "asdfjkl".to_string();
    config
}

fn scheduler(config: AppConfig) -> TestScheduler {
    let library = PatternLibrary::new(
        DaySchedule::for_session(config.session.mode, config.session.day),
        config.session.rng_seed,
    )
    .unwrap();
    TickScheduler::new(
        config,
        60.0,
        library,
        MemoryMetricSink::new(),
        LogClickEmitter::new(),
        Arc::new(TelemetryHub::new(64, 4096, 8)),
    )
}

/// Drives a scheduler on virtual time, optionally pressing every due unit
/// exactly on its onset.
struct Harness {
    scheduler: TestScheduler,
    now: f64,
    perfect: bool,
}

impl Harness {
    fn new(config: AppConfig, perfect: bool) -> Self {
        Self {
            scheduler: scheduler(config),
            now: 0.0,
            perfect,
        }
    }

    fn step(&mut self) -> TickOutcome {
        if let Some(deadline) = self.scheduler.next_deadline() {
            self.now = deadline;
        }
        let outcome = self.scheduler.poll(self.now);
        let clock = self.scheduler.clock();
        if self.perfect
            && outcome == TickOutcome::Ticked
            && clock.tick_phase() == 1
            && clock.note() >= 0
        {
            if let Some(character) = self.scheduler.due_unit().and_then(|u| u.character) {
                let result = self.scheduler.handle_keystroke(Keystroke {
                    character,
                    instant: self.now,
                });
                assert_eq!(result, KeystrokeOutcome::MatchedDue);
            }
        }
        outcome
    }

    fn steps(&mut self, count: u64) {
        for _ in 0..count {
            self.step();
        }
    }

    /// Step until `done` holds, failing after `limit` ticks.
    fn run_until(&mut self, limit: u64, mut done: impl FnMut(&TestScheduler) -> bool) {
        for _ in 0..limit {
            if done(&self.scheduler) {
                return;
            }
            self.step();
        }
        panic!("condition not reached within {} ticks", limit);
    }
}

#[test]
fn test_count_in_reaches_note_zero() {
    let mut harness = Harness::new(config(TrainingMode::Training, true), false);
    assert_eq!(harness.scheduler.phase(), RoundPhase::PreRound);

    harness.step();
    assert_eq!(harness.scheduler.clock().note(), -4);

    harness.steps(COUNT_IN_TICKS);
    assert_eq!(harness.scheduler.clock().note(), 0);
    assert_eq!(harness.scheduler.phase(), RoundPhase::Active);
    // Tick 32 at 60 bpm: 32 × 0.125s
    let first = harness.scheduler.window().get(0).unwrap();
    assert!((first.time_to_press - 4.0).abs() < 1e-9);
    assert!((first.runit_bpm - 60.0 / 750.0).abs() < 1e-12);
}

#[test]
fn test_half_notes_append_lead_then_due_units() {
    let mut harness = Harness::new(config(TrainingMode::Training, true), false);
    // Half-note of note -1 is tick 28.
    harness.steps(29);
    assert_eq!(harness.scheduler.tracker().len(), 1);
    assert_eq!(harness.scheduler.tracker().units()[0].character, None);

    // Half-note of note 0 is tick 36.
    harness.steps(8);
    assert_eq!(harness.scheduler.tracker().len(), 2);
    let appended = harness.scheduler.tracker().latest().unwrap();
    assert_eq!(appended.serial, harness.scheduler.window().get(0).unwrap().serial);
    assert!(harness.scheduler.input().due_appended());
}

#[test]
fn test_deadline_anchored_ticks() {
    let mut s = scheduler(config(TrainingMode::Training, true));
    assert_eq!(s.poll(0.0), TickOutcome::Ticked);
    assert_eq!(s.next_deadline(), Some(0.125));
    assert_eq!(s.poll(0.1), TickOutcome::Idle);
    assert_eq!(s.poll(0.13), TickOutcome::Ticked);
    assert_eq!(s.next_deadline(), Some(0.25), "late tick keeps the grid");
    assert_eq!(s.clock().ticks(), 2);
}

fn fast_scheduler(bpm: f64) -> TestScheduler {
    let mut config = config(TrainingMode::Training, true);
    config.scheduler.overrun_factor = 1e12;
    let library = PatternLibrary::new(
        DaySchedule::for_session(config.session.mode, config.session.day),
        config.session.rng_seed,
    )
    .unwrap();
    TickScheduler::new(
        config,
        bpm,
        library,
        MemoryMetricSink::new(),
        LogClickEmitter::new(),
        Arc::new(TelemetryHub::new(64, 4096, 8)),
    )
}

fn catch_up(s: &mut TestScheduler, now: f64) {
    while s.poll(now) != TickOutcome::Idle {}
}

#[test]
fn test_tick_zero_is_due_at_session_start() {
    let s = fast_scheduler(600.0);
    assert_eq!(s.next_deadline(), Some(0.0));

    // A first poll that arrives late still keeps tick 0 at 0.0.
    let mut s = fast_scheduler(600.0);
    catch_up(&mut s, 0.4);
    assert_eq!(s.clock().ticks(), 33);
}

#[test]
fn test_exact_multiple_of_interval_fires_due_tick() {
    // 600 bpm: 12.5 ms per tick, so 400 ms is exactly tick 32.
    let mut s = fast_scheduler(600.0);
    catch_up(&mut s, 0.0);
    assert_eq!(s.clock().ticks(), 1);

    catch_up(&mut s, std::time::Duration::from_millis(400).as_secs_f64());
    assert_eq!(s.clock().ticks(), 33);
    assert_eq!(s.poll(0.4), TickOutcome::Idle);

    catch_up(&mut s, 1.0);
    assert_eq!(s.clock().ticks(), 81);
}

#[test]
fn test_tempo_change_regrids_from_last_tick() {
    let mut s = scheduler(config(TrainingMode::Training, true));
    catch_up(&mut s, 0.25);
    assert_eq!(s.clock().ticks(), 3);

    s.apply_patch(&ParamPatch {
        bpm_delta: Some(-1),
        ..ParamPatch::default()
    });
    let interval = 60.0 / 55.0 / 8.0;
    assert_eq!(s.next_deadline(), Some(0.25 + interval));
}

#[test]
fn test_overrun_fires_once_and_reanchors() {
    let mut s = scheduler(config(TrainingMode::Training, true));
    s.poll(0.0);
    assert_eq!(s.poll(10.0), TickOutcome::Coalesced);
    assert_eq!(s.clock().ticks(), 2, "skipped ticks are not replayed");
    assert_eq!(s.overruns(), 1);
    assert_eq!(s.next_deadline(), Some(10.125));

    let snapshot = s.telemetry().snapshot();
    assert_eq!(snapshot.overruns, 1);
    assert!(snapshot
        .recent
        .iter()
        .any(|e| matches!(e, MetricEvent::SchedulerOverrun { coalesced: true, .. })));
}

#[test]
fn test_click_follows_compensated_phase() {
    let mut harness = Harness::new(config(TrainingMode::Training, true), false);
    // 60 bpm: round(1.2) = 1 -> factor 0.25 -> phase 6, once per beat
    harness.steps(16);
    assert_eq!(harness.scheduler.click().clicks(), 2);
}

#[test]
fn test_perfect_player_raises_tempo() {
    let mut harness = Harness::new(config(TrainingMode::Training, true), true);
    harness.steps(COUNT_IN_TICKS + 8 * 100);

    let s = &harness.scheduler;
    assert!(s.clock().bpm() > 60.0);
    assert_eq!(s.tracker().stats().errors, 0);
    assert!(s.tracker().stats().successes > 0);
    assert!((s.tracker().stats().mean_accuracy() - 1.0).abs() < 1e-9);
    assert!(s.tracker().peak_bpm() >= 60.0);
    assert!(s.sink().published() >= 98);
}

#[test]
fn test_idle_player_times_out_and_slows_down() {
    let mut harness = Harness::new(config(TrainingMode::Training, true), false);
    harness.steps(COUNT_IN_TICKS + 8 * 60);

    let s = &harness.scheduler;
    assert!(s.tracker().stats().errors > 0);
    assert_eq!(s.tracker().stats().successes, 0);
    assert!(s.clock().bpm() < 60.0);
    let snapshot = s.telemetry().snapshot();
    assert!(snapshot
        .recent
        .iter()
        .any(|e| matches!(e, MetricEvent::TempoChanged { reason: TempoChangeReason::Error, .. })));
}

#[test]
fn test_window_rotates_every_pattern() {
    let mut harness = Harness::new(config(TrainingMode::Training, true), false);
    // Half-note of note 23
    harness.run_until(10_000, |s| s.clock().note() == 23 && s.clock().tick_phase() == 4);
    assert_eq!(harness.scheduler.library().position(), 0);
    harness.step();
    assert_eq!(harness.scheduler.library().position(), 1);

    harness.run_until(10_000, |s| s.clock().note() == 24 && s.clock().tick_phase() == 1);
    assert_eq!(harness.scheduler.input().due_slot(), 0);
}

#[test]
fn test_round_waits_for_verdict_then_resumes() {
    let mut harness = Harness::new(config(TrainingMode::Training, false), true);
    harness.run_until(20_000, |s| s.phase() == RoundPhase::AwaitingValidation);

    let ticks = harness.scheduler.clock().ticks();
    assert_eq!(harness.scheduler.poll(harness.now + 50.0), TickOutcome::Paused);
    assert_eq!(harness.scheduler.clock().ticks(), ticks);
    assert_eq!(harness.scheduler.next_deadline(), None);
    assert!(harness.scheduler.sink().exports().is_empty());
    assert_eq!(harness.scheduler.tracker().len(), 4);
    assert_eq!(harness.scheduler.round(), 2);

    let resume_at = harness.now + 30.0;
    let outcome = harness
        .scheduler
        .submit_verdict(RoundVerdict::Accept, resume_at)
        .unwrap();
    assert_eq!(outcome.round, 1);
    assert_eq!(outcome.rows, 600);
    assert!(outcome.persisted);

    let exports = harness.scheduler.sink().exports();
    assert_eq!(exports.len(), 1);
    assert_eq!(exports[0].rows.len(), 600);
    assert!(exports[0]
        .rows
        .iter()
        .all(|row| (0.0..=1.0).contains(&row.get(crate::performance::matrix::COL_TIME_TO_PRESS))));

    let interval = harness.scheduler.clock().tick_interval();
    assert_eq!(harness.scheduler.next_deadline(), Some(resume_at + interval));
    assert!(harness.scheduler.submit_verdict(RoundVerdict::Accept, resume_at).is_none());
}

#[test]
fn test_declined_round_is_discarded() {
    let mut harness = Harness::new(config(TrainingMode::Training, false), true);
    harness.run_until(20_000, |s| s.phase() == RoundPhase::AwaitingValidation);
    let bpm = harness.scheduler.clock().bpm();

    let outcome = harness
        .scheduler
        .submit_verdict(RoundVerdict::TechnicalProblem, harness.now)
        .unwrap();
    assert!(!outcome.persisted);
    assert!(harness.scheduler.sink().exports().is_empty());
    assert_eq!(harness.scheduler.clock().bpm(), bpm, "tempo carries over");
    assert_eq!(harness.scheduler.outcomes().len(), 1);
}

#[test]
fn test_rounds_hold_exactly_600_units() {
    let mut harness = Harness::new(config(TrainingMode::Training, true), true);
    let mut max_len = 0;
    harness.run_until(40_000, |s| {
        max_len = max_len.max(s.tracker().len());
        s.outcomes().len() == 2
    });

    let outcomes = harness.scheduler.outcomes();
    assert!(outcomes.iter().all(|o| o.rows == 600 && o.persisted));
    assert!(max_len <= 605, "tracker grew to {}", max_len);
    assert_eq!(harness.scheduler.sink().exports().len(), 2);
    assert_eq!(harness.scheduler.round(), 3);
}

/// Writer collecting formatted tracing output.
#[derive(Clone, Default)]
struct CapturedLog(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_round_flush_emits_structured_event() {
    let captured = CapturedLog::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut harness = Harness::new(config(TrainingMode::Training, true), true);
        harness.run_until(20_000, |s| s.outcomes().len() == 1);
    });

    let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("Round finished"), "missing flush event: {}", output);
    assert!(output.contains("round=1"));
    assert!(output.contains("rows=600"));
    assert!(output.contains("persisted=true"));
}

#[test]
fn test_evaluation_resets_tempo_each_round() {
    let mut harness = Harness::new(config(TrainingMode::Evaluation, true), true);
    assert_eq!(harness.scheduler.clock().max_bpm(), 1000.0);
    harness.run_until(20_000, |s| s.round() == 2);

    assert_eq!(harness.scheduler.clock().bpm(), 80.0);
    assert!(!harness.scheduler.apply_patch(&ParamPatch {
        bpm_delta: Some(1),
        ..ParamPatch::default()
    }));
    assert_eq!(harness.scheduler.clock().bpm(), 80.0);
}

#[test]
fn test_keystrokes_before_count_in_are_ignored() {
    let mut s = scheduler(config(TrainingMode::Training, true));
    let outcome = s.handle_keystroke(Keystroke {
        character: 'a',
        instant: 0.0,
    });
    assert_eq!(outcome, KeystrokeOutcome::Ignored);
}

#[test]
fn test_early_press_duplicate_and_mispress() {
    let mut harness = Harness::new(config(TrainingMode::Training, true), false);
    harness.run_until(20_000, |s| {
        let (Some(due), Some(next)) = (s.due_unit(), s.next_unit()) else {
            return false;
        };
        due.expects_press() && next.character.is_some() && due.character != next.character
    });

    let next_char = harness.scheduler.next_unit().unwrap().character.unwrap();
    let next_serial = harness.scheduler.next_unit().unwrap().serial;
    let at = harness.now;

    let press = |character| Keystroke {
        character,
        instant: at,
    };
    assert_eq!(
        harness.scheduler.handle_keystroke(press(next_char)),
        KeystrokeOutcome::MatchedNext
    );
    assert_eq!(
        harness.scheduler.handle_keystroke(press(next_char)),
        KeystrokeOutcome::Duplicate
    );
    let pressed = harness
        .scheduler
        .window()
        .units()
        .iter()
        .find(|u| u.serial == next_serial)
        .unwrap();
    assert_eq!(pressed.time_pressed, Some(at));

    let expected = harness.scheduler.due_unit().unwrap().character;
    assert_eq!(
        harness.scheduler.handle_keystroke(press('#')),
        KeystrokeOutcome::Mispress { expected }
    );
    assert!(harness.scheduler.due_unit().unwrap().error);
}

#[test]
fn test_patch_adjusts_parameters() {
    let mut s = scheduler(config(TrainingMode::Training, true));
    let changed = s.apply_patch(&ParamPatch {
        frequency_delta: Some(1),
        step_delta: Some(10),
        bpm_delta: Some(-1),
    });
    assert!(changed);
    assert_eq!(s.tracker().controller().modification_frequency(), 3);
    assert_eq!(s.tracker().controller().modification_step(), 1, "step +10 is out of range");
    assert_eq!(s.clock().bpm(), 55.0);
}
