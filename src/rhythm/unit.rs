//! RhythmicUnit - one scheduled beat and everything measured about it.

use serde::{Deserialize, Serialize};

use crate::rhythm::{half_pattern, Pattern, RhythmKind, HALF_PATTERN_LEN};

/// Means over a trailing window of resolved units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowAverages {
    pub bpm: f64,
    pub accuracy: f64,
    pub performance: f64,
    pub error: f64,
}

/// One slot of the active window, from scheduling through resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmicUnit {
    /// Monotonic identity across window rebuilds.
    pub serial: u64,
    /// Slot within the 96-slot window when the unit was created.
    pub index: usize,
    pub kind: RhythmKind,
    /// Key the player must strike; `None` for silences.
    pub character: Option<char>,

    /// Scheduled press instant, seconds since session start (normalized after a flush).
    pub time_to_press: f64,
    /// Actual press instant, if any.
    pub time_pressed: Option<f64>,

    pub accuracy: f64,
    pub performance: f64,
    pub avg_12: WindowAverages,
    pub avg_24: WindowAverages,
    pub avg_96: WindowAverages,
    pub acc_avg_half_pattern: f64,
    pub perf_avg_half_pattern: f64,
    pub bpm_avg_half_pattern: f64,
    pub error: bool,
    pub success: bool,
    /// Whether accuracy and performance have been computed.
    pub resolved: bool,

    /// `bpm / maxBpm` at the note onset.
    pub runit_bpm: f64,
    /// Modification frequency normalized to its maximum.
    pub modification_frequency: f64,
    /// Modification step normalized to its maximum.
    pub step_up: f64,
    pub step_down: f64,

    /// Own kind × 0.3.
    pub rhythmic_value: f64,
    /// Kinds × 0.3 of the half-pattern the unit is played in.
    pub rhythmic_values: [f64; HALF_PATTERN_LEN],
}

impl RhythmicUnit {
    pub fn new(serial: u64, index: usize, kind: RhythmKind, character: Option<char>) -> Self {
        Self {
            serial,
            index,
            kind,
            character,
            time_to_press: 0.0,
            time_pressed: None,
            accuracy: 0.0,
            performance: 0.0,
            avg_12: WindowAverages::default(),
            avg_24: WindowAverages::default(),
            avg_96: WindowAverages::default(),
            acc_avg_half_pattern: 0.0,
            perf_avg_half_pattern: 0.0,
            bpm_avg_half_pattern: 0.0,
            error: false,
            success: false,
            resolved: false,
            runit_bpm: 0.0,
            modification_frequency: 0.0,
            step_up: 0.0,
            step_down: 0.0,
            rhythmic_value: 0.0,
            rhythmic_values: [0.0; HALF_PATTERN_LEN],
        }
    }

    /// Placeholder unit that precedes the first scheduled note.
    pub fn lead(serial: u64) -> Self {
        Self::new(serial, 0, RhythmKind::Silence, None)
    }

    /// Whether a keystroke is expected for this unit.
    pub fn expects_press(&self) -> bool {
        self.character.is_some()
    }

    pub fn is_pressed(&self) -> bool {
        self.time_pressed.is_some()
    }

    /// Stamp the onset: scheduled instant, normalized bpm and rhythmic values.
    ///
    /// `slot` is the unit's position inside `pattern` (`0..24`).
    pub fn activate(&mut self, instant: f64, runit_bpm: f64, pattern: &Pattern, slot: usize) {
        self.time_to_press = instant;
        self.runit_bpm = runit_bpm;
        self.rhythmic_value = pattern[slot].rhythmic_value();
        for (value, kind) in self
            .rhythmic_values
            .iter_mut()
            .zip(half_pattern(pattern, slot))
        {
            *value = kind.rhythmic_value();
        }
    }

    /// Record a keystroke; a unit keeps its first press.
    pub fn press(&mut self, instant: f64) -> bool {
        if self.time_pressed.is_some() {
            return false;
        }
        self.time_pressed = Some(instant);
        true
    }

    /// Signed offset of the press from the scheduled instant, seconds.
    pub fn offset(&self) -> Option<f64> {
        self.time_pressed.map(|pressed| pressed - self.time_to_press)
    }

    pub fn error_value(&self) -> f64 {
        if self.error {
            1.0
        } else {
            0.0
        }
    }
}
