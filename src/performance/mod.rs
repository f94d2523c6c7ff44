//! Performance module - scoring, rolling statistics and adaptive tempo
//!
//! [`PerformanceTracker`] owns the append-only unit sequence (`allUnits`) and
//! the mirrored [`MetricMatrix`]. The scheduler appends the due unit at every
//! half-note and asks the tracker to resolve the one before it; by then no
//! keystroke can reach that unit any more.

pub mod accuracy;
pub mod adaptive;
pub mod averages;
pub mod matrix;

use serde::Serialize;

use crate::clock::SessionClock;
use crate::config::AppConfig;
use crate::rhythm::{RhythmicUnit, HALF_PATTERN_LEN};

pub use accuracy::{
    compute_accuracy, compute_performance, TimingClassification, TimingFeedback,
};
pub use adaptive::{AdaptiveTempoController, TempoChange, TempoChangeReason};
pub use averages::{half_pattern_averages, trailing_averages, HalfPatternAverages, ROLLING_WINDOWS};
pub use matrix::{MetricMatrix, MetricRow, METRIC_COLUMNS};

/// Units kept after a trim: the lead unit of the next round plus three carried notes.
const CARRIED_UNITS: usize = 3;

/// Outcome of resolving one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Note counter value of the resolved unit within its round
    pub note: i64,
    pub serial: u64,
    pub accuracy: f64,
    pub performance: f64,
    /// Trailing 24-unit performance, `None` until 24 units exist
    pub performance_24: Option<f64>,
    pub error: bool,
    pub timing: Option<TimingFeedback>,
    /// Tempo change requested by the controller, if it was applied
    pub tempo_change: Option<TempoChange>,
    /// Row of the resolved unit
    pub row: MetricRow,
}

/// Running totals across the whole session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrackerStats {
    pub resolved: u64,
    pub successes: u64,
    pub errors: u64,
    /// Sum of accuracies over units that expected a keystroke
    pub accuracy_sum: f64,
    pub scored: u64,
}

impl TrackerStats {
    pub fn mean_accuracy(&self) -> f64 {
        if self.scored == 0 {
            0.0
        } else {
            self.accuracy_sum / self.scored as f64
        }
    }
}

/// Resolved-unit sequence, metric rows and the adaptive controller.
pub struct PerformanceTracker {
    units: Vec<RhythmicUnit>,
    matrix: MetricMatrix,
    controller: AdaptiveTempoController,
    round_length: usize,
    trim_threshold: usize,
    peak_bpm: f64,
    stats: TrackerStats,
}

impl PerformanceTracker {
    pub fn new(config: &AppConfig) -> Self {
        let round_length = config.round.length as usize;
        Self {
            units: Vec::with_capacity(config.round.trim_threshold + 1),
            matrix: MetricMatrix::new(),
            controller: AdaptiveTempoController::new(&config.adaptive),
            round_length,
            trim_threshold: config.round.trim_threshold.max(round_length + 1),
            peak_bpm: 0.0,
            stats: TrackerStats::default(),
        }
    }

    /// Append a unit and its row.
    pub fn append(&mut self, unit: RhythmicUnit) {
        self.matrix.push(MetricRow::from_unit(&unit));
        self.units.push(unit);
    }

    pub fn units(&self) -> &[RhythmicUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn latest(&self) -> Option<&RhythmicUnit> {
        self.units.last()
    }

    pub fn latest_mut(&mut self) -> Option<&mut RhythmicUnit> {
        self.units.last_mut()
    }

    pub fn matrix(&self) -> &MetricMatrix {
        &self.matrix
    }

    pub fn controller(&self) -> &AdaptiveTempoController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut AdaptiveTempoController {
        &mut self.controller
    }

    /// Highest bpm in effect at a successful resolution.
    pub fn peak_bpm(&self) -> f64 {
        self.peak_bpm
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    /// Resolve the unit before the most recently appended one.
    ///
    /// Computes accuracy and performance, detects a timeout, feeds the
    /// controller exactly once, updates the rolling averages and, on the last
    /// note of a half-pattern, broadcasts the half-pattern averages onto its
    /// twelve units.
    ///
    /// # Arguments
    /// * `clock` - Session clock; the controller may change its bpm
    /// * `note` - Note counter value of the unit being resolved
    ///
    /// # Returns
    /// `None` when fewer than two units exist or the unit was already resolved
    pub fn resolve_previous(&mut self, clock: &mut SessionClock, note: i64) -> Option<Resolution> {
        if self.units.len() < 2 {
            return None;
        }
        let idx = self.units.len() - 2;
        if self.units[idx].resolved {
            return None;
        }

        let bpm = clock.bpm();
        let tempo = clock.tempo();
        let max_bpm = clock.max_bpm();
        let frequency = self.controller.normalized_frequency();
        let step = self.controller.normalized_step();

        let unit = &mut self.units[idx];
        unit.accuracy = match unit.offset() {
            Some(offset) => compute_accuracy(offset, tempo),
            None => 0.0,
        };
        if unit.expects_press() && !unit.is_pressed() {
            log::trace!(
                "[PerformanceTracker] Timeout on note {} ({:?})",
                note,
                unit.character
            );
            unit.error = true;
        }

        let tempo_change = if !unit.error && unit.accuracy > 0.0 {
            unit.performance = compute_performance(unit.accuracy, false, bpm, max_bpm);
            unit.success = true;
            self.stats.successes += 1;
            self.peak_bpm = self.peak_bpm.max(bpm);
            self.controller.on_success(clock)
        } else {
            unit.performance = 0.0;
            if unit.expects_press() {
                unit.error = true;
                self.stats.errors += 1;
                self.controller.on_error(clock)
            } else {
                None
            }
        };

        unit.modification_frequency = frequency;
        unit.step_up = step;
        unit.step_down = step;
        unit.resolved = true;

        let timing = unit.offset().map(|offset| TimingFeedback::classify(offset, tempo));
        let serial = unit.serial;
        let accuracy = unit.accuracy;
        let performance = unit.performance;
        let error = unit.error;

        self.stats.resolved += 1;
        if self.units[idx].expects_press() {
            self.stats.scored += 1;
            self.stats.accuracy_sum += accuracy;
        }

        self.update_rolling_averages(idx);
        if note >= HALF_PATTERN_LEN as i64 - 1 && note % HALF_PATTERN_LEN as i64 == 11 {
            self.broadcast_half_pattern(idx);
        }

        let row = MetricRow::from_unit(&self.units[idx]);
        self.matrix.set(idx, row);

        Some(Resolution {
            note,
            serial,
            accuracy,
            performance,
            performance_24: (idx >= 24).then(|| self.units[idx].avg_24.performance),
            error,
            timing,
            tempo_change,
            row,
        })
    }

    /// Export the finished round and trim the sequence.
    ///
    /// Rows for the round's units are returned with press instants normalized
    /// into [0, 1] between `round_start` and `round_end`. The lead row and the
    /// three units carried into the next round are excluded.
    pub fn flush_round(&mut self, round_start: f64, round_end: f64) -> Vec<MetricRow> {
        let rows = self.export_rows(round_start, round_end);
        self.trim();
        rows
    }

    /// Normalized rows of the round currently held, without trimming.
    pub fn export_rows(&self, round_start: f64, round_end: f64) -> Vec<MetricRow> {
        let end = self.units.len().saturating_sub(CARRIED_UNITS);
        let start = end.saturating_sub(self.round_length).max(1);
        if start >= end {
            return Vec::new();
        }

        let span = round_end - round_start;
        self.units[start..end]
            .iter()
            .map(|unit| {
                let mut row = MetricRow::from_unit(unit);
                if span > 0.0 {
                    row.0[matrix::COL_TIME_TO_PRESS] = (unit.time_to_press - round_start) / span;
                    if let Some(pressed) = unit.time_pressed {
                        row.0[matrix::COL_TIME_PRESSED] = (pressed - round_start) / span;
                    }
                }
                row
            })
            .collect()
    }

    /// Drop the oldest round of units and rows once the threshold is reached.
    ///
    /// # Returns
    /// Whether anything was removed
    pub fn trim(&mut self) -> bool {
        if self.units.len() < self.trim_threshold {
            return false;
        }
        self.units.drain(..self.round_length);
        self.matrix.drain_front(self.round_length);
        log::debug!(
            "[PerformanceTracker] Trimmed to {} units after round",
            self.units.len()
        );
        true
    }

    fn update_rolling_averages(&mut self, idx: usize) {
        // Index 0 is the lead unit of the round and never counts.
        let history = &self.units[1..=idx];
        let averages: Vec<_> = ROLLING_WINDOWS
            .iter()
            .map(|window| trailing_averages(history, *window))
            .collect();

        let unit = &mut self.units[idx];
        if let Some(avg) = averages[0] {
            unit.avg_12 = avg;
        }
        if let Some(avg) = averages[1] {
            unit.avg_24 = avg;
        }
        if let Some(avg) = averages[2] {
            unit.avg_96 = avg;
        }
    }

    fn broadcast_half_pattern(&mut self, idx: usize) {
        let Some(half) = half_pattern_averages(&self.units[1..=idx]) else {
            return;
        };
        let first = idx + 1 - HALF_PATTERN_LEN;
        for i in first..=idx {
            let unit = &mut self.units[i];
            unit.acc_avg_half_pattern = half.accuracy;
            unit.perf_avg_half_pattern = half.performance;
            unit.bpm_avg_half_pattern = half.bpm;
            self.matrix.set(i, MetricRow::from_unit(unit));
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhythm::RhythmKind;

    fn tracker() -> PerformanceTracker {
        let mut tracker = PerformanceTracker::new(&AppConfig::default());
        tracker.append(RhythmicUnit::lead(0));
        tracker
    }

    fn scheduled(serial: u64, at: f64) -> RhythmicUnit {
        let mut unit = RhythmicUnit::new(serial, serial as usize, RhythmKind::Soft, Some('f'));
        unit.time_to_press = at;
        unit.runit_bpm = 0.08;
        unit
    }

    /// Append the unit for `note` (pressed `delay` late when given) and
    /// resolve the unit of the note before it.
    fn play(
        tracker: &mut PerformanceTracker,
        clock: &mut SessionClock,
        note: i64,
        delay: Option<f64>,
    ) -> Option<Resolution> {
        let mut unit = scheduled(note as u64 + 1, note as f64);
        if let Some(delay) = delay {
            unit.press(note as f64 + delay);
        }
        tracker.append(unit);
        if note >= 1 {
            tracker.resolve_previous(clock, note - 1)
        } else {
            None
        }
    }

    #[test]
    fn test_resolution_scores_on_time_press() {
        let mut tracker = tracker();
        let mut clock = SessionClock::new(60.0, 5.0, 750.0, 8);
        play(&mut tracker, &mut clock, 0, Some(0.1));
        let resolution = play(&mut tracker, &mut clock, 1, None).unwrap();

        assert_eq!(resolution.note, 0);
        assert_eq!(resolution.accuracy, 1.0);
        assert!((resolution.performance - 0.08).abs() < 1e-12);
        assert!(!resolution.error);
        assert_eq!(
            resolution.timing.unwrap().classification,
            TimingClassification::OnTime
        );
        assert_eq!(tracker.peak_bpm(), 60.0);
    }

    #[test]
    fn test_timeout_is_error_and_penalized_once() {
        let mut tracker = tracker();
        let mut clock = SessionClock::new(100.0, 5.0, 750.0, 8);
        play(&mut tracker, &mut clock, 0, None);
        let resolution = play(&mut tracker, &mut clock, 1, Some(0.0)).unwrap();

        assert!(resolution.error);
        assert_eq!(resolution.performance, 0.0);
        assert_eq!(resolution.tempo_change.unwrap().bpm, 99.0);
        assert_eq!(tracker.stats().errors, 1);

        // Resolving the same position again is a no-op.
        assert!(tracker.resolve_previous(&mut clock, 0).is_none());
        assert_eq!(clock.bpm(), 99.0);
    }

    #[test]
    fn test_late_press_outside_window_is_error() {
        let mut tracker = tracker();
        // bpm 100: tempo 0.6s, scoring window 0.3s
        let mut clock = SessionClock::new(100.0, 5.0, 750.0, 8);
        play(&mut tracker, &mut clock, 0, Some(0.0));
        play(&mut tracker, &mut clock, 1, Some(0.4));
        let resolution = play(&mut tracker, &mut clock, 2, None).unwrap();

        assert_eq!(resolution.accuracy, 0.0);
        assert!(resolution.error);
        assert_eq!(tracker.controller().successes_in_a_row(), 0);
    }

    #[test]
    fn test_mispress_marked_unit_is_error_even_when_pressed() {
        let mut tracker = tracker();
        let mut clock = SessionClock::new(100.0, 5.0, 750.0, 8);
        play(&mut tracker, &mut clock, 0, Some(0.0));
        tracker.latest_mut().unwrap().error = true;
        let resolution = play(&mut tracker, &mut clock, 1, None).unwrap();
        assert!(resolution.error);
        assert_eq!(resolution.performance, 0.0);
        assert_eq!(clock.bpm(), 99.0);
    }

    #[test]
    fn test_silence_is_neither_success_nor_error() {
        let mut tracker = tracker();
        let mut clock = SessionClock::new(60.0, 5.0, 750.0, 8);
        tracker.append(RhythmicUnit::new(1, 1, RhythmKind::Silence, None));
        tracker.append(scheduled(2, 1.0));
        let resolution = tracker.resolve_previous(&mut clock, 0).unwrap();
        assert!(!resolution.error);
        assert!(resolution.tempo_change.is_none());
        assert_eq!(tracker.stats().scored, 0);
        assert_eq!(tracker.stats().resolved, 1);
    }

    #[test]
    fn test_streak_raises_tempo() {
        let mut tracker = tracker();
        let mut clock = SessionClock::new(60.0, 5.0, 750.0, 8);
        play(&mut tracker, &mut clock, 0, Some(0.0));
        play(&mut tracker, &mut clock, 1, Some(0.0));
        let second = play(&mut tracker, &mut clock, 2, None).unwrap();
        assert_eq!(second.tempo_change.unwrap().reason, TempoChangeReason::Streak);
        assert_eq!(clock.bpm(), 61.0);
    }

    #[test]
    fn test_rolling_and_half_pattern_averages() {
        let mut tracker = tracker();
        let mut clock = SessionClock::new(60.0, 5.0, 750.0, 8);
        // Step 0 keeps the tempo steady for the whole run.
        tracker.controller_mut().adjust_step(-1);

        let mut last = None;
        for note in 0..25 {
            let delay = if note % 2 == 0 { Some(0.0) } else { None };
            last = play(&mut tracker, &mut clock, note, delay);
        }
        let last = last.unwrap();
        assert_eq!(last.note, 23);
        let resolved = &tracker.units()[tracker.len() - 2];

        assert!((resolved.avg_24.accuracy - 0.5).abs() < 1e-12);
        assert!((resolved.avg_24.error - 0.5).abs() < 1e-12);
        assert!((resolved.avg_12.accuracy - 0.5).abs() < 1e-12);
        assert_eq!(resolved.avg_96, Default::default());
        assert!(last.performance_24.is_some());

        // Note 23 closes a half-pattern: its twelve units share the values.
        let half = &tracker.units()[tracker.len() - 13..tracker.len() - 1];
        assert!(half
            .iter()
            .all(|u| (u.acc_avg_half_pattern - 0.5).abs() < 1e-12));
        assert!(half
            .iter()
            .all(|u| (u.bpm_avg_half_pattern - 0.24).abs() < 1e-12));
        let row = tracker.matrix().get(tracker.len() - 13).unwrap();
        assert!((row.get(matrix::COL_ACCURACY_HALF_PATTERN) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_flush_exports_round_and_trims() {
        let mut tracker = tracker();
        for i in 1..604u64 {
            let mut unit = scheduled(i, 10.0 + i as f64);
            unit.press(10.0 + i as f64);
            tracker.append(unit);
        }
        assert_eq!(tracker.len(), 604);

        let rows = tracker.flush_round(10.0, 610.0);
        assert_eq!(rows.len(), 600);
        assert!((rows[0].get(matrix::COL_TIME_TO_PRESS) - 1.0 / 600.0).abs() < 1e-12);
        assert!((rows[599].get(matrix::COL_TIME_PRESSED) - 1.0).abs() < 1e-12);
        assert_eq!(tracker.len(), 4);
        assert_eq!(tracker.matrix().len(), 4);
        assert_eq!(tracker.units()[0].serial, 600);
    }

    #[test]
    fn test_trim_waits_for_threshold() {
        let mut tracker = tracker();
        for i in 1..603u64 {
            tracker.append(scheduled(i, i as f64));
        }
        assert!(!tracker.trim());
        assert_eq!(tracker.len(), 603);
    }
}
