//! Seeded player model.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::input::Keystroke;
use crate::rhythm::RhythmicUnit;

/// How a simulated player behaves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    /// Probability of pressing a unit that expects a keystroke
    pub hit_rate: f64,
    /// Presses land uniformly within ± this many milliseconds of the onset
    pub jitter_ms: f64,
    pub seed: u64,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            hit_rate: 1.0,
            jitter_ms: 0.0,
            seed: 0,
        }
    }
}

/// Plans one keystroke per sounding unit and releases them in time order.
pub struct SimulatedPlayer {
    profile: PlayerProfile,
    rng: StdRng,
    last_planned: Option<u64>,
    pending: Vec<Keystroke>,
    planned: u64,
    skipped: u64,
}

impl SimulatedPlayer {
    pub fn new(profile: PlayerProfile) -> Self {
        Self {
            rng: StdRng::seed_from_u64(profile.seed),
            profile,
            last_planned: None,
            pending: Vec::new(),
            planned: 0,
            skipped: 0,
        }
    }

    pub fn profile(&self) -> &PlayerProfile {
        &self.profile
    }

    /// Keystrokes planned so far.
    pub fn planned(&self) -> u64 {
        self.planned
    }

    /// Units deliberately left unpressed.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Decide once per unit whether and when to press it.
    ///
    /// # Arguments
    /// * `unit` - A unit that just became pressable
    /// * `onset` - Expected onset of `unit` in session seconds
    /// * `now` - Current session time; presses are never planned before it
    pub fn plan(&mut self, unit: &RhythmicUnit, onset: f64, now: f64) {
        if self.last_planned.map_or(false, |serial| unit.serial <= serial) {
            return;
        }
        self.last_planned = Some(unit.serial);

        let Some(character) = unit.character else {
            return;
        };
        if unit.is_pressed() {
            return;
        }
        if !self.rng.gen_bool(self.profile.hit_rate.clamp(0.0, 1.0)) {
            self.skipped += 1;
            return;
        }

        let spread = self.profile.jitter_ms.max(0.0) / 1000.0;
        let offset = if spread > 0.0 {
            self.rng.gen_range(-spread..=spread)
        } else {
            0.0
        };
        self.pending.push(Keystroke {
            character,
            instant: (onset + offset).max(now),
        });
        self.planned += 1;
    }

    /// Remove and return, oldest first, the keystrokes due before `deadline`.
    pub fn take_before(&mut self, deadline: f64) -> Vec<Keystroke> {
        let mut due: Vec<Keystroke> = Vec::new();
        self.pending.retain(|keystroke| {
            if keystroke.instant < deadline {
                due.push(*keystroke);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.instant.total_cmp(&b.instant));
        due
    }
}
