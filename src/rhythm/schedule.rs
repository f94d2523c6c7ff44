//! Day schedules: which catalog patterns a practice day plays, in order.

use serde::Serialize;

use crate::config::{TrainingDay, TrainingMode};
use crate::error::PatternError;
use crate::rhythm::catalog::RANDOM_PATTERN_INDEX;

const TRAINING_DAY_ONE: [usize; 25] = [
    31, 0, 1, 2, 3, 4, 31, 10, 11, 12, 13, 14, 31, 20, 21, 22, 23, 24, 31, 32, 32, 32, 32, 31, 31,
];

const TRAINING_DAY_TWO: [usize; 25] = [
    31, 5, 6, 7, 8, 9, 31, 15, 16, 17, 18, 19, 31, 25, 26, 27, 28, 29, 31, 32, 32, 32, 32, 31, 31,
];

const EVALUATION_DAY_ONE: [usize; 25] = [
    72, 31, 54, 55, 56, 57, 31, 68, 69, 70, 71, 71, 31, 53, 54, 55, 56, 57, 31, 68, 69, 70, 71, 30,
    31,
];

const EVALUATION_DAY_TWO: [usize; 25] = [
    72, 31, 10, 11, 12, 13, 31, 0, 1, 2, 3, 4, 31, 73, 11, 12, 13, 14, 31, 0, 1, 2, 3, 30, 31,
];

/// Ordered catalog indices for one practice day.
///
/// Entries equal to [`RANDOM_PATTERN_INDEX`] ask the library for a freshly
/// generated pattern. The schedule wraps around when exhausted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySchedule {
    mode: TrainingMode,
    day: TrainingDay,
    entries: Vec<usize>,
}

impl DaySchedule {
    /// Built-in schedule for a mode/day pair.
    pub fn for_session(mode: TrainingMode, day: TrainingDay) -> Self {
        let entries = match (mode, day) {
            (TrainingMode::Training, TrainingDay::One) => TRAINING_DAY_ONE,
            (TrainingMode::Training, TrainingDay::Two) => TRAINING_DAY_TWO,
            (TrainingMode::Evaluation, TrainingDay::One) => EVALUATION_DAY_ONE,
            (TrainingMode::Evaluation, TrainingDay::Two) => EVALUATION_DAY_TWO,
        };
        Self {
            mode,
            day,
            entries: entries.to_vec(),
        }
    }

    /// Externally supplied schedule; call [`DaySchedule::validate`] before use.
    pub fn custom(mode: TrainingMode, day: TrainingDay, entries: Vec<usize>) -> Self {
        Self { mode, day, entries }
    }

    pub fn mode(&self) -> TrainingMode {
        self.mode
    }

    pub fn day(&self) -> TrainingDay {
        self.day
    }

    pub fn entries(&self) -> &[usize] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `position`, wrapping past the end.
    pub fn entry(&self, position: usize) -> usize {
        self.entries[position % self.entries.len()]
    }

    pub fn is_random(&self, position: usize) -> bool {
        self.entry(position) == RANDOM_PATTERN_INDEX
    }

    /// Random patterns never contain zoomed accents on the first training day.
    pub fn forbids_zoomed_accents(&self) -> bool {
        self.mode == TrainingMode::Training && self.day == TrainingDay::One
    }

    /// Reject empty schedules and entries outside a catalog of `catalog_len`.
    pub fn validate(&self, catalog_len: usize) -> Result<(), PatternError> {
        if self.entries.is_empty() {
            return Err(PatternError::EmptySchedule);
        }
        for (position, index) in self.entries.iter().enumerate() {
            if *index >= catalog_len {
                return Err(PatternError::UnknownPatternIndex {
                    position,
                    index: *index,
                    catalog_len,
                });
            }
        }
        Ok(())
    }
}
