//! Rhythm module - patterns, units and the active pattern window
//!
//! A pattern is a fixed sequence of 24 rhythmic kinds. Four consecutive
//! patterns form the 96-slot window the player is currently working through;
//! every slot of the window is backed by a [`RhythmicUnit`].

pub mod catalog;
pub mod characters;
pub mod library;
pub mod schedule;
pub mod unit;
pub mod window;

use serde::{Deserialize, Serialize};

use crate::error::PatternError;

pub use catalog::{base_patterns, RANDOM_PATTERN_INDEX};
pub use characters::CharacterFeed;
pub use library::{PatternLibrary, PatternSource};
pub use schedule::DaySchedule;
pub use unit::RhythmicUnit;
pub use window::UnitWindow;

/// Slots in one pattern.
pub const PATTERN_LEN: usize = 24;

/// Slots in one half-pattern.
pub const HALF_PATTERN_LEN: usize = PATTERN_LEN / 2;

/// Patterns in the active window.
pub const WINDOW_PATTERNS: usize = 4;

/// Slots in the active window.
pub const WINDOW_LEN: usize = PATTERN_LEN * WINDOW_PATTERNS;

/// Scale applied to a kind's numeric value when exported as a rhythmic value.
pub const RHYTHMIC_VALUE_SCALE: f64 = 0.3;

/// Rhythmic category of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RhythmKind {
    Silence,
    Soft,
    Accent,
    AccentZoomed,
}

impl RhythmKind {
    /// Numeric value used by pattern schedules and exported matrices (0..=3).
    pub fn value(self) -> u8 {
        match self {
            RhythmKind::Silence => 0,
            RhythmKind::Soft => 1,
            RhythmKind::Accent => 2,
            RhythmKind::AccentZoomed => 3,
        }
    }

    /// `value × 0.3`, the form consumed by downstream models.
    pub fn rhythmic_value(self) -> f64 {
        self.value() as f64 * RHYTHMIC_VALUE_SCALE
    }

    pub fn is_silence(self) -> bool {
        self == RhythmKind::Silence
    }

    /// Accents become zoomed accents; everything else is unchanged.
    pub fn zoomed(self) -> Self {
        match self {
            RhythmKind::Accent => RhythmKind::AccentZoomed,
            other => other,
        }
    }
}

impl TryFrom<u8> for RhythmKind {
    type Error = PatternError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RhythmKind::Silence),
            1 => Ok(RhythmKind::Soft),
            2 => Ok(RhythmKind::Accent),
            3 => Ok(RhythmKind::AccentZoomed),
            other => Err(PatternError::InvalidKind { value: other }),
        }
    }
}

/// One 24-slot rhythmic pattern.
pub type Pattern = [RhythmKind; PATTERN_LEN];

/// Build a pattern from raw kind values.
pub fn pattern_from_values(values: &[u8]) -> Result<Pattern, PatternError> {
    if values.len() != PATTERN_LEN {
        return Err(PatternError::InvalidPatternLength {
            expected: PATTERN_LEN,
            actual: values.len(),
        });
    }

    let mut pattern = [RhythmKind::Silence; PATTERN_LEN];
    for (slot, value) in pattern.iter_mut().zip(values) {
        *slot = RhythmKind::try_from(*value)?;
    }
    Ok(pattern)
}

/// The half of `pattern` that contains `slot`.
pub fn half_pattern(pattern: &Pattern, slot: usize) -> &[RhythmKind] {
    if slot % PATTERN_LEN < HALF_PATTERN_LEN {
        &pattern[..HALF_PATTERN_LEN]
    } else {
        &pattern[HALF_PATTERN_LEN..]
    }
}
