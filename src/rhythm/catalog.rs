//! Base pattern catalog
//!
//! Legend for the raw tables: 0 = silence, 1 = soft, 2 = accent,
//! 3 = zoomed accent. Index ranges:
//!
//! | indices | content                                           |
//! |---------|---------------------------------------------------|
//! | 0-4     | soft grids with accent groupings                  |
//! | 5-9     | 0-4 with zoomed accents                           |
//! | 10-14   | syncopated grids (mode-specific)                  |
//! | 15-19   | 10-14 with zoomed accents                         |
//! | 20-24   | excerpts from Mozart's Jupiter Symphony, mvt. 1   |
//! | 25-29   | 20-24 with zoomed accents                         |
//! | 30      | all soft                                          |
//! | 31      | pause: 12 silences then 12 softs                  |
//! | 32      | random slot placeholder                           |
//! | 33-52   | first set of optimized patterns                   |
//! | 53-71   | second set of optimized patterns                  |
//! | 72      | all silence                                       |
//! | 73      | variation of the evaluation pattern 10            |

use once_cell::sync::Lazy;

use crate::config::TrainingMode;
use crate::rhythm::{Pattern, RhythmKind, PATTERN_LEN};

/// Catalog index that schedules use to request a freshly generated pattern.
pub const RANDOM_PATTERN_INDEX: usize = 32;

/// Number of base patterns in either catalog variant.
pub const CATALOG_LEN: usize = 74;

type Raw = [u8; PATTERN_LEN];

const ACCENT_GRIDS: [Raw; 5] = [
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 1, 2, 1, 2, 2, 1, 2, 1, 2, 1],
    [2, 1, 1, 2, 1, 1, 2, 1, 1, 2, 1, 1, 2, 1, 1, 1, 2, 1, 1, 1, 2, 1, 1, 1],
    [2, 1, 1, 1, 1, 2, 1, 1, 1, 2, 1, 1, 1, 2, 1, 1, 1, 2, 1, 1, 1, 2, 1, 1],
    [1, 1, 2, 1, 1, 1, 1, 2, 1, 1, 1, 1, 2, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 2],
    [1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 1, 2, 1, 1, 1, 1],
];

const SYNCOPATED_TRAINING: [Raw; 5] = [
    [2, 0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1],
    [2, 0, 0, 1, 2, 0, 0, 1, 2, 0, 0, 1, 2, 0, 0, 1, 2, 0, 0, 1, 2, 0, 0, 1],
    [2, 0, 0, 1, 2, 0, 0, 1, 2, 0, 0, 0, 1, 2, 0, 0, 0, 1, 2, 0, 0, 0, 1, 2],
    [0, 0, 0, 1, 2, 0, 0, 0, 1, 2, 0, 0, 0, 1, 2, 0, 0, 0, 1, 2, 0, 0, 0, 1],
    [2, 0, 0, 0, 0, 1, 2, 0, 0, 0, 0, 1, 2, 0, 0, 0, 0, 1, 2, 0, 0, 0, 0, 1],
];

const SYNCOPATED_EVALUATION: [Raw; 5] = [
    [1, 1, 1, 1, 1, 0, 1, 2, 0, 1, 2, 0, 1, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2],
    [1, 1, 1, 2, 0, 1, 1, 2, 0, 1, 1, 2, 0, 1, 1, 2, 1, 1, 1, 2, 0, 1, 1, 2],
    [0, 1, 1, 2, 0, 1, 1, 2, 1, 1, 1, 1, 2, 0, 1, 1, 1, 2, 0, 1, 1, 1, 2, 0],
    [1, 1, 1, 2, 1, 1, 1, 1, 2, 0, 1, 1, 1, 2, 0, 1, 1, 1, 2, 0, 1, 1, 1, 2],
    [1, 1, 1, 1, 1, 2, 0, 1, 1, 1, 1, 2, 1, 1, 1, 1, 1, 2, 0, 1, 1, 1, 1, 2],
];

const JUPITER: [Raw; 5] = [
    [2, 0, 0, 0, 2, 0, 0, 1, 2, 0, 0, 0, 2, 0, 0, 1, 2, 0, 1, 0, 2, 0, 1, 0],
    [2, 0, 0, 0, 2, 0, 0, 1, 2, 0, 0, 0, 2, 0, 0, 1, 2, 0, 1, 0, 2, 0, 1, 0],
    [2, 0, 1, 0, 2, 0, 1, 0, 2, 0, 1, 0, 1, 1, 1, 1, 2, 0, 1, 0, 2, 0, 1, 0],
    [2, 0, 1, 0, 1, 1, 1, 1, 2, 0, 1, 0, 2, 0, 1, 0, 2, 0, 1, 0, 1, 1, 1, 1],
    [1, 1, 1, 1, 2, 2, 2, 2, 1, 1, 1, 1, 2, 2, 2, 2, 1, 1, 1, 1, 2, 2, 2, 2],
];

const ALL_SOFT: Raw = [1; PATTERN_LEN];

const PAUSE: Raw = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1];

const ALL_SILENCE: Raw = [0; PATTERN_LEN];

const OPTIMIZED_FIRST_SET: [Raw; 20] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2],
    [2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2],
    [3, 2, 2, 3, 2, 2, 3, 2, 2, 3, 2, 2, 3, 3, 2, 3, 3, 2, 3, 3, 2, 3, 3, 2],
    [1, 2, 3, 1, 2, 3, 1, 2, 3, 1, 2, 3, 2, 3, 3, 2, 3, 3, 2, 3, 3, 2, 3, 3],
    [2, 0, 2, 1, 2, 0, 2, 1, 2, 0, 2, 1, 2, 0, 2, 1, 2, 0, 2, 1, 2, 0, 2, 1],
    [2, 0, 2, 3, 2, 0, 2, 3, 2, 0, 2, 3, 2, 0, 2, 3, 2, 0, 2, 3, 2, 0, 2, 3],
    [2, 0, 0, 2, 1, 2, 0, 2, 1, 2, 0, 2, 1, 2, 0, 2, 1, 2, 0, 2, 1, 2, 0, 2],
    [1, 2, 3, 2, 3, 1, 2, 3, 2, 3, 1, 2, 3, 2, 3, 1, 2, 3, 2, 3, 1, 2, 3, 2],
    [3, 0, 0, 1, 2, 3, 3, 2, 1, 2, 3, 3, 2, 1, 2, 3, 3, 2, 1, 2, 3, 3, 2, 1],
    [2, 3, 2, 3, 1, 2, 3, 2, 3, 1, 2, 3, 2, 3, 1, 2, 3, 2, 3, 1, 2, 3, 2, 3],
    [1, 2, 3, 0, 0, 3, 2, 1, 1, 2, 3, 0, 0, 3, 2, 1, 1, 2, 3, 0, 0, 3, 2, 1],
    [0, 2, 2, 3, 0, 3, 2, 2, 0, 2, 2, 3, 0, 3, 2, 2, 0, 2, 2, 3, 0, 3, 2, 2],
    [0, 3, 3, 2, 2, 3, 3, 0, 0, 3, 3, 2, 2, 3, 3, 0, 0, 3, 3, 2, 2, 3, 3, 0],
    [2, 0, 2, 1, 1, 2, 0, 3, 2, 0, 2, 1, 1, 2, 0, 3, 2, 0, 2, 1, 1, 2, 0, 3],
    [1, 2, 3, 2, 0, 2, 0, 2, 1, 2, 3, 2, 0, 2, 0, 2, 1, 2, 3, 2, 0, 2, 0, 2],
    [2, 3, 1, 3, 2, 2, 0, 3, 2, 3, 1, 3, 2, 2, 0, 3, 2, 3, 1, 3, 2, 2, 0, 3],
    [1, 2, 1, 2, 3, 2, 0, 2, 1, 2, 1, 2, 3, 2, 0, 1, 1, 2, 1, 2, 3, 2, 0, 2],
    [3, 1, 2, 3, 2, 0, 2, 1, 3, 1, 2, 3, 2, 0, 2, 1, 3, 1, 2, 3, 2, 0, 2, 1],
    [0, 3, 1, 2, 3, 2, 0, 2, 0, 3, 1, 2, 3, 2, 0, 2, 0, 3, 1, 2, 3, 2, 0, 2],
    [1, 2, 3, 1, 2, 3, 3, 2, 1, 2, 3, 1, 2, 3, 3, 2, 1, 2, 3, 1, 2, 3, 3, 2],
];

const OPTIMIZED_SECOND_SET: [Raw; 19] = [
    [3, 3, 2, 3, 3, 3, 2, 3, 3, 3, 2, 3, 3, 3, 2, 3, 3, 3, 2, 3, 3, 3, 2, 3],
    [3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 3, 2, 1, 0, 3, 0, 3, 0, 1, 1],
    [1, 0, 3, 0, 3, 0, 1, 1, 3, 0, 3, 2, 3, 0, 2, 1, 3, 0, 3, 2, 3, 0, 2, 1],
    [3, 0, 3, 2, 3, 0, 2, 1, 3, 0, 3, 2, 3, 0, 2, 1, 2, 0, 3, 2, 3, 2, 3, 3],
    [2, 0, 3, 2, 3, 2, 3, 3, 2, 0, 3, 2, 3, 2, 3, 3, 2, 0, 3, 2, 3, 2, 3, 3],
    [2, 3, 3, 3, 2, 3, 3, 3, 2, 3, 3, 3, 2, 3, 3, 3, 2, 3, 3, 3, 2, 3, 3, 3],
    [3, 1, 3, 1, 3, 1, 3, 3, 3, 1, 3, 1, 3, 1, 3, 3, 3, 1, 3, 1, 3, 1, 3, 3],
    [1, 3, 1, 3, 1, 3, 1, 3, 3, 3, 1, 3, 3, 3, 1, 3, 1, 3, 1, 3, 3, 3, 1, 3],
    [3, 1, 2, 3, 2, 1, 3, 2, 3, 1, 2, 3, 2, 1, 3, 2, 3, 1, 2, 3, 2, 1, 3, 2],
    [3, 1, 2, 3, 2, 1, 3, 2, 3, 1, 2, 3, 2, 1, 3, 2, 3, 1, 2, 3, 2, 1, 3, 2],
    [3, 2, 2, 3, 3, 2, 2, 3, 3, 2, 2, 3, 3, 2, 2, 3, 2, 3, 3, 0, 3, 2, 0, 2],
    [2, 3, 3, 0, 3, 2, 0, 2, 2, 3, 3, 0, 3, 2, 0, 2, 2, 3, 3, 0, 3, 2, 0, 2],
    [2, 3, 3, 0, 3, 3, 0, 2, 2, 3, 2, 1, 3, 3, 1, 0, 2, 3, 2, 1, 3, 3, 1, 0],
    [2, 3, 2, 1, 3, 3, 1, 0, 2, 3, 2, 1, 3, 3, 1, 0, 3, 3, 3, 1, 3, 2, 0, 3],
    [3, 3, 3, 1, 3, 2, 0, 3, 3, 3, 3, 1, 3, 2, 0, 3, 3, 3, 3, 1, 3, 2, 0, 3],
    [3, 2, 2, 3, 3, 2, 2, 3, 3, 2, 2, 3, 3, 2, 2, 3, 3, 2, 2, 3, 3, 2, 2, 3],
    [2, 3, 3, 1, 2, 3, 1, 3, 2, 3, 3, 1, 2, 3, 1, 3, 2, 3, 3, 1, 2, 3, 1, 3],
    [2, 2, 3, 1, 3, 3, 1, 3, 2, 2, 3, 1, 3, 3, 1, 3, 2, 2, 3, 1, 3, 3, 1, 3],
    [3, 2, 3, 1, 3, 2, 3, 2, 3, 2, 3, 1, 3, 2, 3, 2, 3, 2, 3, 1, 3, 2, 3, 2],
];

const EVALUATION_VARIATION: Raw = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 0, 1, 2, 0, 1, 2, 0, 1, 2,
];

static TRAINING_CATALOG: Lazy<Vec<Pattern>> =
    Lazy::new(|| build_catalog(&SYNCOPATED_TRAINING));

static EVALUATION_CATALOG: Lazy<Vec<Pattern>> =
    Lazy::new(|| build_catalog(&SYNCOPATED_EVALUATION));

/// The fixed base catalog for `mode`.
///
/// Both variants hold [`CATALOG_LEN`] patterns and differ only at 10-14
/// (and their zoomed copies at 15-19).
pub fn base_patterns(mode: TrainingMode) -> &'static [Pattern] {
    match mode {
        TrainingMode::Training => &TRAINING_CATALOG,
        TrainingMode::Evaluation => &EVALUATION_CATALOG,
    }
}

fn build_catalog(syncopated: &[Raw; 5]) -> Vec<Pattern> {
    let mut catalog = Vec::with_capacity(CATALOG_LEN);

    push_with_zoomed_copies(&mut catalog, &ACCENT_GRIDS);
    push_with_zoomed_copies(&mut catalog, syncopated);
    push_with_zoomed_copies(&mut catalog, &JUPITER);

    catalog.push(to_pattern(&ALL_SOFT));
    catalog.push(to_pattern(&PAUSE));
    catalog.push(to_pattern(&ALL_SILENCE));

    catalog.extend(OPTIMIZED_FIRST_SET.iter().map(to_pattern));
    catalog.extend(OPTIMIZED_SECOND_SET.iter().map(to_pattern));

    catalog.push(to_pattern(&ALL_SILENCE));
    catalog.push(to_pattern(&EVALUATION_VARIATION));

    debug_assert_eq!(catalog.len(), CATALOG_LEN);
    catalog
}

fn push_with_zoomed_copies(catalog: &mut Vec<Pattern>, group: &[Raw; 5]) {
    let patterns: Vec<Pattern> = group.iter().map(to_pattern).collect();
    let zoomed: Vec<Pattern> = patterns
        .iter()
        .map(|pattern| pattern.map(RhythmKind::zoomed))
        .collect();
    catalog.extend(patterns);
    catalog.extend(zoomed);
}

fn to_pattern(raw: &Raw) -> Pattern {
    raw.map(|value| RhythmKind::try_from(value).unwrap_or(RhythmKind::Silence))
}
