//! Rolling and half-pattern averages over resolved units

use crate::rhythm::unit::WindowAverages;
use crate::rhythm::{RhythmicUnit, HALF_PATTERN_LEN};

/// Rolling window sizes, in units.
pub const ROLLING_WINDOWS: [usize; 3] = [12, 24, 96];

/// Mean bpm, accuracy, performance and error over the last `window` units of `units`.
///
/// Returns `None` until at least `window` units exist.
pub fn trailing_averages(units: &[RhythmicUnit], window: usize) -> Option<WindowAverages> {
    if window == 0 || units.len() < window {
        return None;
    }
    let tail = &units[units.len() - window..];
    let n = window as f64;
    let mut sums = WindowAverages::default();
    for unit in tail {
        sums.bpm += unit.runit_bpm;
        sums.accuracy += unit.accuracy;
        sums.performance += unit.performance;
        sums.error += unit.error_value();
    }
    Some(WindowAverages {
        bpm: sums.bpm / n,
        accuracy: sums.accuracy / n,
        performance: sums.performance / n,
        error: sums.error / n,
    })
}

/// Half-pattern summary broadcast onto the twelve units it covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfPatternAverages {
    pub accuracy: f64,
    pub performance: f64,
    /// Mean normalized bpm × 3
    pub bpm: f64,
}

/// Averages over the last twelve units of `units`, or `None` if fewer exist.
pub fn half_pattern_averages(units: &[RhythmicUnit]) -> Option<HalfPatternAverages> {
    let averages = trailing_averages(units, HALF_PATTERN_LEN)?;
    Some(HalfPatternAverages {
        accuracy: averages.accuracy,
        performance: averages.performance,
        bpm: averages.bpm * 3.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhythm::RhythmKind;

    fn units_with_accuracy(values: &[f64]) -> Vec<RhythmicUnit> {
        values
            .iter()
            .enumerate()
            .map(|(i, acc)| {
                let mut unit = RhythmicUnit::new(i as u64, i, RhythmKind::Soft, Some('k'));
                unit.accuracy = *acc;
                unit.performance = *acc / 2.0;
                unit.runit_bpm = 0.1;
                unit
            })
            .collect()
    }

    #[test]
    fn test_constant_run_averages_to_constant() {
        let units = units_with_accuracy(&[0.7; 12]);
        let avg = trailing_averages(&units, 12).unwrap();
        assert!((avg.accuracy - 0.7).abs() < 1e-12);
        assert!((avg.performance - 0.35).abs() < 1e-12);
        assert_eq!(avg.error, 0.0);
    }

    #[test]
    fn test_alternating_run_averages_to_half() {
        let values: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
        let units = units_with_accuracy(&values);
        let avg = trailing_averages(&units, 24).unwrap();
        assert!((avg.accuracy - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_window_requires_enough_units() {
        let units = units_with_accuracy(&[1.0; 95]);
        assert!(trailing_averages(&units, 96).is_none());
        assert!(trailing_averages(&units, 24).is_some());
    }

    #[test]
    fn test_half_pattern_bpm_is_tripled() {
        let mut units = units_with_accuracy(&[0.5; 14]);
        units[13].error = true;
        let half = half_pattern_averages(&units).unwrap();
        assert!((half.bpm - 0.3).abs() < 1e-12);
        assert!((half.accuracy - 0.5).abs() < 1e-12);
    }
}
