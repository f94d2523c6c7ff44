//! SessionClock - shared tempo and musical-time counters
//!
//! One value object holds the bpm, the derived tempo (seconds per quarter
//! note), the bpm bounds, and the tick/note counters. The scheduler owns it and
//! lends it by reference to the tracker and controller.

/// Note counter value a session starts from.
pub const FIRST_NOTE: i64 = -5;

/// Tempo and counter state for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClock {
    bpm: f64,
    tempo: f64,
    min_bpm: f64,
    max_bpm: f64,
    subdivisions: u32,
    ticks: u64,
    note: i64,
}

impl SessionClock {
    /// Create a clock at `bpm`.
    ///
    /// The starting bpm is clamped into `[min_bpm, max_bpm]`; later changes go
    /// through [`SessionClock::apply_bpm_delta`], which never clamps.
    pub fn new(bpm: f64, min_bpm: f64, max_bpm: f64, subdivisions: u32) -> Self {
        let bpm = bpm.clamp(min_bpm, max_bpm);
        Self {
            bpm,
            tempo: 60.0 / bpm,
            min_bpm,
            max_bpm,
            subdivisions: subdivisions.max(1),
            ticks: 0,
            note: FIRST_NOTE,
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Seconds per quarter-note beat.
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn min_bpm(&self) -> f64 {
        self.min_bpm
    }

    pub fn max_bpm(&self) -> f64 {
        self.max_bpm
    }

    pub fn subdivisions(&self) -> u32 {
        self.subdivisions
    }

    /// Seconds between two ticks at the current tempo.
    pub fn tick_interval(&self) -> f64 {
        self.tempo / self.subdivisions as f64
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Position of the current tick inside its beat, `0..subdivisions`.
    pub fn tick_phase(&self) -> u64 {
        self.ticks % self.subdivisions as u64
    }

    /// Current note counter; negative during the pre-roll.
    pub fn note(&self) -> i64 {
        self.note
    }

    /// Tempo normalized against the upper bound, as stored on each unit.
    pub fn normalized_bpm(&self) -> f64 {
        self.bpm / self.max_bpm
    }

    /// Change bpm by `delta` if the result stays inside the bounds.
    ///
    /// Returns the new bpm when applied; out-of-range requests leave the clock
    /// untouched and return `None`.
    pub fn apply_bpm_delta(&mut self, delta: f64) -> Option<f64> {
        let candidate = self.bpm + delta;
        if !candidate.is_finite() || candidate < self.min_bpm || candidate > self.max_bpm {
            return None;
        }
        self.bpm = candidate;
        self.tempo = 60.0 / candidate;
        Some(candidate)
    }

    /// Jump to an absolute bpm, clamped into the bounds.
    pub fn reset_bpm(&mut self, bpm: f64) {
        self.bpm = bpm.clamp(self.min_bpm, self.max_bpm);
        self.tempo = 60.0 / self.bpm;
    }

    pub(crate) fn advance_tick(&mut self) {
        self.ticks += 1;
    }

    pub(crate) fn advance_note(&mut self) {
        self.note += 1;
    }

    pub(crate) fn rewind_note_to(&mut self, note: i64) {
        self.note = note;
    }
}
