//! PatternLibrary - catalog access and the sliding 4-pattern window
//!
//! The library owns the active window (`rp1..rp4`). The scheduler reads kinds
//! through [`PatternSource`] and mutates it only through
//! [`PatternSource::advance_window`].

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PatternError;
use crate::rhythm::catalog::base_patterns;
use crate::rhythm::schedule::DaySchedule;
use crate::rhythm::{
    Pattern, RhythmKind, HALF_PATTERN_LEN, PATTERN_LEN, RHYTHMIC_VALUE_SCALE, WINDOW_LEN,
    WINDOW_PATTERNS,
};

/// Catalog size from which every generated pattern triggers an eviction.
pub const CATALOG_EVICTION_THRESHOLD: usize = 38;

/// The evicted entry sits this many places from the end of the catalog.
pub const EVICTION_OFFSET_FROM_END: usize = 5;

/// Read access to the active window plus its single mutator.
pub trait PatternSource {
    /// Kind at `slot` of the 96-slot window.
    fn window_kind(&self, slot: usize) -> RhythmKind;

    /// The first pattern of the window, the one currently being played.
    fn current_pattern(&self) -> &Pattern;

    /// Drop the first pattern, shift the rest forward and load a new last one.
    fn advance_window(&mut self);
}

/// Catalog, day schedule and the active window.
///
/// The catalog is the literal patterns followed by the generated ones. Literal
/// entries are pinned so the indices used by day schedules never shift.
pub struct PatternLibrary {
    catalog: &'static [Pattern],
    generated: VecDeque<Pattern>,
    schedule: DaySchedule,
    position: usize,
    window: [Pattern; WINDOW_PATTERNS],
    rng: StdRng,
}

impl PatternLibrary {
    /// Validate `schedule` and build the first window from its first four entries.
    ///
    /// # Arguments
    /// * `schedule` - Day schedule; its mode selects the catalog variant
    /// * `rng_seed` - Seed for random patterns, or `None` for entropy
    ///
    /// # Returns
    /// * `Err(PatternError)` - The schedule is empty or references a missing pattern
    pub fn new(schedule: DaySchedule, rng_seed: Option<u64>) -> Result<Self, PatternError> {
        let catalog = base_patterns(schedule.mode());
        schedule.validate(catalog.len())?;

        let rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut library = Self {
            catalog,
            generated: VecDeque::with_capacity(EVICTION_OFFSET_FROM_END),
            schedule,
            position: 0,
            window: [[RhythmKind::Silence; PATTERN_LEN]; WINDOW_PATTERNS],
            rng,
        };
        for offset in 0..WINDOW_PATTERNS {
            library.window[offset] = library.pattern_for_position(offset);
        }

        log::debug!(
            "[PatternLibrary] Window initialized from schedule {:?}",
            &library.schedule.entries()[..WINDOW_PATTERNS.min(library.schedule.len())]
        );
        Ok(library)
    }

    /// The whole catalog: literal patterns, then retained generated ones.
    pub fn base_patterns(&self) -> impl Iterator<Item = &Pattern> + '_ {
        self.catalog.iter().chain(self.generated.iter())
    }

    /// Catalog entry at `index`, literal or generated.
    pub fn base_pattern(&self, index: usize) -> Option<&Pattern> {
        self.catalog
            .get(index)
            .or_else(|| self.generated.get(index - self.catalog.len()))
    }

    pub fn base_len(&self) -> usize {
        self.catalog.len() + self.generated.len()
    }

    /// The literal patterns day schedules index into.
    pub fn literal_patterns(&self) -> &'static [Pattern] {
        self.catalog
    }

    /// Generated patterns still retained, oldest first.
    pub fn generated_patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.generated.iter()
    }

    pub fn schedule(&self) -> &DaySchedule {
        &self.schedule
    }

    /// How many times the window has advanced.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn window_patterns(&self) -> &[Pattern; WINDOW_PATTERNS] {
        &self.window
    }

    /// Uniformly random pattern; zoomed accents become accents when excluded.
    ///
    /// The pattern is appended to the catalog. Once the catalog holds
    /// [`CATALOG_EVICTION_THRESHOLD`] entries, the entry
    /// [`EVICTION_OFFSET_FROM_END`] places from the end is removed unless it is
    /// a literal one.
    pub fn generate_random_pattern(&mut self, exclude_zoomed_accents: bool) -> Pattern {
        let mut pattern = [RhythmKind::Silence; PATTERN_LEN];
        for slot in pattern.iter_mut() {
            let kind = match self.rng.gen_range(0..=3u8) {
                0 => RhythmKind::Silence,
                1 => RhythmKind::Soft,
                2 => RhythmKind::Accent,
                _ if exclude_zoomed_accents => RhythmKind::Accent,
                _ => RhythmKind::AccentZoomed,
            };
            *slot = kind;
        }

        self.generated.push_back(pattern);
        self.evict_generated();
        pattern
    }

    /// Twelve random rhythmic values (`kind × 0.3`, one decimal) for the
    /// offline pattern search.
    pub fn generate_random_half_pattern(&mut self) -> [f64; HALF_PATTERN_LEN] {
        let mut values = [0.0; HALF_PATTERN_LEN];
        for value in values.iter_mut() {
            let kind = self.rng.gen_range(0..=3u8) as f64;
            *value = (kind * RHYTHMIC_VALUE_SCALE * 10.0).round() / 10.0;
        }
        values
    }

    fn evict_generated(&mut self) {
        let len = self.base_len();
        if len < CATALOG_EVICTION_THRESHOLD || len < EVICTION_OFFSET_FROM_END {
            return;
        }
        let victim = len - EVICTION_OFFSET_FROM_END;
        if victim < self.catalog.len() {
            return;
        }
        self.generated.remove(victim - self.catalog.len());
        log::trace!(
            "[PatternLibrary] Evicted generated pattern at catalog index {}",
            victim
        );
    }

    fn pattern_for_position(&mut self, position: usize) -> Pattern {
        if self.schedule.is_random(position) {
            let exclude = self.schedule.forbids_zoomed_accents();
            self.generate_random_pattern(exclude)
        } else {
            self.catalog[self.schedule.entry(position)]
        }
    }
}

impl PatternSource for PatternLibrary {
    fn window_kind(&self, slot: usize) -> RhythmKind {
        let slot = slot % WINDOW_LEN;
        self.window[slot / PATTERN_LEN][slot % PATTERN_LEN]
    }

    fn current_pattern(&self) -> &Pattern {
        &self.window[0]
    }

    fn advance_window(&mut self) {
        self.position += 1;
        self.window.rotate_left(1);
        let incoming = self.position + WINDOW_PATTERNS - 1;
        self.window[WINDOW_PATTERNS - 1] = self.pattern_for_position(incoming);

        log::debug!(
            "[PatternLibrary] Window advanced to position {} (incoming schedule entry {})",
            self.position,
            self.schedule.entry(incoming)
        );
    }
}
