//! InputResolver - matches keystrokes against the pressable units
//!
//! Two units are pressable at any instant: the unit due now and, once the
//! half-note has passed and it is not a silence, the unit after it. Accepting
//! the next unit early absorbs scheduling jitter around the onset.

use serde::{Deserialize, Serialize};

use crate::rhythm::{RhythmicUnit, PATTERN_LEN};

/// One keystroke as captured by the input thread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keystroke {
    pub character: char,
    /// Seconds since session start at the moment of the key press
    pub instant: f64,
}

/// What a keystroke was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum KeystrokeOutcome {
    /// Stamped on the unit due now
    MatchedDue,
    /// Stamped early on the following unit
    MatchedNext,
    /// The matching unit was already pressed; first press wins
    Duplicate,
    /// Wrong key; the due unit is marked as an error
    Mispress { expected: Option<char> },
    /// Arrived before the first note could be pressed
    Ignored,
}

/// Which unit a keystroke should be stamped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressTarget {
    Due,
    Next,
    Duplicate,
    Mispress { expected: Option<char> },
}

/// Cursor over the pressable slots of the active window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputResolver {
    due_slot: usize,
    next_slot: usize,
    due_appended: bool,
}

impl InputResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Window slot of the unit due now.
    pub fn due_slot(&self) -> usize {
        self.due_slot
    }

    /// Window slot of the furthest pressable unit; equals the due slot when
    /// only one unit is pressable.
    pub fn next_slot(&self) -> usize {
        self.next_slot
    }

    /// Whether the due unit already lives in the tracker rather than the window.
    pub fn due_appended(&self) -> bool {
        self.due_appended
    }

    /// Whether a separate next unit is pressable.
    pub fn has_next(&self) -> bool {
        self.next_slot != self.due_slot
    }

    /// Half-note passed: the due unit moved to the tracker, and the next unit
    /// becomes pressable when it sounds.
    pub(crate) fn on_half_note(&mut self, next_is_sounding: bool) {
        if next_is_sounding && self.next_slot == self.due_slot {
            self.next_slot = self.due_slot + 1;
        }
        self.due_appended = true;
    }

    /// The window shifted by one pattern.
    pub(crate) fn on_window_rotated(&mut self) {
        if self.next_slot >= PATTERN_LEN {
            self.next_slot -= PATTERN_LEN;
        }
    }

    /// Note onset: advance the due slot (once notes are running) and collapse
    /// the pressable range onto it.
    pub(crate) fn on_onset(&mut self, advance: bool) {
        if advance {
            self.due_slot = (self.due_slot + 1) % PATTERN_LEN;
        }
        self.next_slot = self.due_slot;
        self.due_appended = false;
    }

    /// Decide where `character` goes.
    ///
    /// The next unit wins when it matches and is still unpressed; otherwise the
    /// due unit is tried. A matching but already-pressed unit is a duplicate.
    pub fn target(
        &self,
        character: char,
        due: Option<&RhythmicUnit>,
        next: Option<&RhythmicUnit>,
    ) -> PressTarget {
        if let Some(next) = next {
            if next.character == Some(character) && !next.is_pressed() {
                return PressTarget::Next;
            }
        }
        if let Some(due) = due {
            if due.character == Some(character) {
                return if due.is_pressed() {
                    PressTarget::Duplicate
                } else {
                    PressTarget::Due
                };
            }
        }
        if next.map_or(false, |n| n.character == Some(character)) {
            return PressTarget::Duplicate;
        }
        PressTarget::Mispress {
            expected: due.and_then(|u| u.character),
        }
    }
}
