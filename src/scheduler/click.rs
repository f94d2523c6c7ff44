//! Metronome click phase with output-latency compensation
//!
//! The click is shifted ahead of the beat by a bpm-dependent number of ticks
//! to absorb a fixed audio buffer delay. The mapping is an empirically tuned
//! lookup and is reproduced exactly, discontinuities included.

/// Bpm ranges played on the beat without compensation.
const UNCOMPENSATED_RANGE: (f64, f64) = (325.0, 385.0);
const UNCOMPENSATED_ABOVE: f64 = 610.0;

/// Compensation fraction for `bpm`: `((round(bpm/50) mod n) × 125 + 125) mod 1000 / 1000`.
///
/// Rounding is half-to-even.
pub fn compensation_factor(bpm: f64, subdivisions: u32) -> f64 {
    let n = subdivisions.max(1) as i64;
    let factor = ((bpm / 50.0).round_ties_even() as i64).rem_euclid(n);
    ((factor * 125 + 125) % 1000) as f64 / 1000.0
}

/// Tick phase (`0..subdivisions`) at which the click fires for `bpm`.
///
/// # Returns
/// `None` when the compensated phase falls outside the beat, in which case no
/// click is played
pub fn click_phase(bpm: f64, subdivisions: u32) -> Option<u64> {
    let n = subdivisions.max(1) as f64;
    if (bpm >= UNCOMPENSATED_RANGE.0 && bpm <= UNCOMPENSATED_RANGE.1) || bpm > UNCOMPENSATED_ABOVE
    {
        return Some(0);
    }
    let phase = n - n * compensation_factor(bpm, subdivisions);
    if phase < 0.0 || phase >= n || phase.fract() != 0.0 {
        return None;
    }
    Some(phase as u64)
}

/// Whether the click fires on a tick with the given phase.
pub fn should_click(tick_phase: u64, bpm: f64, subdivisions: u32) -> bool {
    click_phase(bpm, subdivisions) == Some(tick_phase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_tempo_clicks_one_tick_early() {
        // round(80/50) = 2 -> factor2 = 0.375 -> phase 5
        assert_eq!(compensation_factor(80.0, 8), 0.375);
        assert_eq!(click_phase(80.0, 8), Some(5));
        // round(20/50) = 0 -> factor2 = 0.125 -> phase 7
        assert_eq!(click_phase(20.0, 8), Some(7));
    }

    #[test]
    fn test_half_way_values_round_to_even() {
        // 75/50 = 1.5 -> 2, 125/50 = 2.5 -> 2
        assert_eq!(compensation_factor(75.0, 8), 0.375);
        assert_eq!(compensation_factor(125.0, 8), 0.375);
        // 175/50 = 3.5 -> 4
        assert_eq!(compensation_factor(175.0, 8), 0.625);
    }

    #[test]
    fn test_uncompensated_ranges_play_on_the_beat() {
        assert_eq!(click_phase(325.0, 8), Some(0));
        assert_eq!(click_phase(385.0, 8), Some(0));
        assert_eq!(click_phase(611.0, 8), Some(0));
        assert!(should_click(0, 700.0, 8));
        assert!(!should_click(1, 700.0, 8));
    }

    #[test]
    fn test_factor_wraps_with_subdivisions() {
        // round(400/50) = 8 -> 8 mod 8 = 0 -> phase 7
        assert_eq!(click_phase(400.0, 8), Some(7));
        // round(600/50) = 12 -> 4 -> factor2 = 0.625 -> phase 3
        assert_eq!(click_phase(600.0, 8), Some(3));
    }

    #[test]
    fn test_every_tempo_outside_ranges_has_a_phase() {
        for bpm in 5..=610 {
            let bpm = bpm as f64;
            assert!(click_phase(bpm, 8).is_some(), "no click at {} bpm", bpm);
        }
    }
}
