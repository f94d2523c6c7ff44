//! MetricMatrix - 28-column rows mirroring each resolved unit
//!
//! Rows are kept one-for-one with the tracker's unit sequence. The column
//! order is fixed; downstream readers address values by position.

use serde::{Deserialize, Serialize};

use crate::rhythm::{RhythmicUnit, HALF_PATTERN_LEN};

/// Values per row.
pub const METRIC_COLUMNS: usize = 28;

// ====== Column positions ======
pub const COL_BPM: usize = 0;
pub const COL_MODIFICATION_FREQUENCY: usize = 1;
pub const COL_TIME_TO_PRESS: usize = 2;
pub const COL_TIME_PRESSED: usize = 3;
pub const COL_ACCURACY: usize = 4;
pub const COL_ACCURACY_12: usize = 5;
pub const COL_ACCURACY_24: usize = 6;
pub const COL_ACCURACY_HALF_PATTERN: usize = 7;
pub const COL_PERFORMANCE: usize = 8;
pub const COL_PERFORMANCE_12: usize = 9;
pub const COL_PERFORMANCE_24: usize = 10;
pub const COL_PERFORMANCE_HALF_PATTERN: usize = 11;
pub const COL_RHYTHMIC_VALUE: usize = 12;
/// First of the twelve half-pattern rhythmic values (columns 13..=24).
pub const COL_RHYTHMIC_VALUES: usize = 13;
pub const COL_STEP_UP: usize = 25;
pub const COL_STEP_DOWN: usize = 26;
pub const COL_BPM_HALF_PATTERN: usize = 27;

/// One row of the metric matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRow(pub [f64; METRIC_COLUMNS]);

impl MetricRow {
    /// Snapshot the exported fields of `unit`.
    pub fn from_unit(unit: &RhythmicUnit) -> Self {
        let mut values = [0.0; METRIC_COLUMNS];
        values[COL_BPM] = unit.runit_bpm;
        values[COL_MODIFICATION_FREQUENCY] = unit.modification_frequency;
        values[COL_TIME_TO_PRESS] = unit.time_to_press;
        values[COL_TIME_PRESSED] = unit.time_pressed.unwrap_or(0.0);
        values[COL_ACCURACY] = unit.accuracy;
        values[COL_ACCURACY_12] = unit.avg_12.accuracy;
        values[COL_ACCURACY_24] = unit.avg_24.accuracy;
        values[COL_ACCURACY_HALF_PATTERN] = unit.acc_avg_half_pattern;
        values[COL_PERFORMANCE] = unit.performance;
        values[COL_PERFORMANCE_12] = unit.avg_12.performance;
        values[COL_PERFORMANCE_24] = unit.avg_24.performance;
        values[COL_PERFORMANCE_HALF_PATTERN] = unit.perf_avg_half_pattern;
        values[COL_RHYTHMIC_VALUE] = unit.rhythmic_value;
        values[COL_RHYTHMIC_VALUES..COL_RHYTHMIC_VALUES + HALF_PATTERN_LEN]
            .copy_from_slice(&unit.rhythmic_values);
        values[COL_STEP_UP] = unit.step_up;
        values[COL_STEP_DOWN] = unit.step_down;
        values[COL_BPM_HALF_PATTERN] = unit.bpm_avg_half_pattern;
        Self(values)
    }

    pub fn get(&self, column: usize) -> f64 {
        self.0[column]
    }

    pub fn values(&self) -> &[f64; METRIC_COLUMNS] {
        &self.0
    }
}

impl Default for MetricRow {
    fn default() -> Self {
        Self([0.0; METRIC_COLUMNS])
    }
}

/// Rows for every unit still held by the tracker.
#[derive(Debug, Clone, Default)]
pub struct MetricMatrix {
    rows: Vec<MetricRow>,
}

impl MetricMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: MetricRow) {
        self.rows.push(row);
    }

    /// Overwrite the row at `index`; out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, row: MetricRow) {
        if let Some(slot) = self.rows.get_mut(index) {
            *slot = row;
        }
    }

    pub fn get(&self, index: usize) -> Option<&MetricRow> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Remove the first `count` rows.
    pub fn drain_front(&mut self, count: usize) {
        let count = count.min(self.rows.len());
        self.rows.drain(..count);
    }
}
