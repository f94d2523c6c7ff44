//! AdaptiveTempoController - closed-loop tempo adjustment
//!
//! Successes pay out only every `modification_frequency` hits in a row; every
//! error costs tempo immediately. All changes are saturating: a request that
//! would leave the clock's bpm bounds is dropped, not clamped.

use serde::{Deserialize, Serialize};

use crate::clock::SessionClock;
use crate::config::AdaptiveConfig;

/// Why the tempo changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoChangeReason {
    /// Success streak reached the modification frequency
    Streak,
    /// A unit resolved as an error
    Error,
    /// Player nudged the tempo manually
    Nudge,
    /// Tempo reset at a round boundary
    RoundReset,
}

/// Applied tempo change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoChange {
    pub bpm: f64,
    pub reason: TempoChangeReason,
}

/// Streak counter plus the player-tunable frequency and step.
#[derive(Debug, Clone)]
pub struct AdaptiveTempoController {
    successes_in_a_row: u32,
    modification_frequency: u32,
    modification_step: u32,
    config: AdaptiveConfig,
}

impl AdaptiveTempoController {
    /// Create a controller from configuration.
    ///
    /// Starting frequency and step are clamped into their configured ranges.
    pub fn new(config: &AdaptiveConfig) -> Self {
        let modification_frequency = config.modification_frequency.clamp(
            config.min_modification_frequency,
            config.max_modification_frequency.max(config.min_modification_frequency),
        );
        let modification_step = config.modification_step.clamp(
            config.min_modification_step,
            config.max_modification_step.max(config.min_modification_step),
        );
        Self {
            successes_in_a_row: 0,
            modification_frequency,
            modification_step,
            config: config.clone(),
        }
    }

    pub fn successes_in_a_row(&self) -> u32 {
        self.successes_in_a_row
    }

    pub fn modification_frequency(&self) -> u32 {
        self.modification_frequency
    }

    pub fn modification_step(&self) -> u32 {
        self.modification_step
    }

    /// Frequency normalized against its maximum, as stored on each unit.
    pub fn normalized_frequency(&self) -> f64 {
        normalize(self.modification_frequency, self.config.max_modification_frequency)
    }

    /// Step normalized against its maximum, as stored on each unit.
    pub fn normalized_step(&self) -> f64 {
        normalize(self.modification_step, self.config.max_modification_step)
    }

    /// Record a successful unit; raises the tempo once the streak is long enough.
    pub fn on_success(&mut self, clock: &mut SessionClock) -> Option<TempoChange> {
        self.successes_in_a_row += 1;
        if self.successes_in_a_row < self.modification_frequency {
            return None;
        }
        self.successes_in_a_row = 0;
        self.apply(clock, self.modification_step as f64, TempoChangeReason::Streak)
    }

    /// Record an error; lowers the tempo and resets the streak.
    pub fn on_error(&mut self, clock: &mut SessionClock) -> Option<TempoChange> {
        self.successes_in_a_row = 0;
        let delta = -(self.modification_step as f64) * self.config.error_penalty_factor;
        self.apply(clock, delta, TempoChangeReason::Error)
    }

    /// Dispatch on the outcome of a resolved unit.
    pub fn manage_adaptive_mechanics(
        &mut self,
        clock: &mut SessionClock,
        is_error: bool,
    ) -> Option<TempoChange> {
        if is_error {
            self.on_error(clock)
        } else {
            self.on_success(clock)
        }
    }

    /// Move the frequency by `delta`; ignored if it would leave its range.
    pub fn adjust_frequency(&mut self, delta: i32) -> bool {
        saturating_adjust(
            &mut self.modification_frequency,
            delta,
            self.config.min_modification_frequency,
            self.config.max_modification_frequency,
        )
    }

    /// Move the step by `delta`; ignored if it would leave its range.
    pub fn adjust_step(&mut self, delta: i32) -> bool {
        saturating_adjust(
            &mut self.modification_step,
            delta,
            self.config.min_modification_step,
            self.config.max_modification_step,
        )
    }

    /// Manual tempo nudge by `direction × bpm_nudge`.
    pub fn nudge(&self, clock: &mut SessionClock, direction: i32) -> Option<TempoChange> {
        let delta = direction.signum() as f64 * self.config.bpm_nudge;
        self.apply(clock, delta, TempoChangeReason::Nudge)
    }

    fn apply(
        &self,
        clock: &mut SessionClock,
        delta: f64,
        reason: TempoChangeReason,
    ) -> Option<TempoChange> {
        if delta == 0.0 {
            return None;
        }
        let bpm = clock.apply_bpm_delta(delta)?;
        log::debug!(
            "[AdaptiveTempoController] Tempo {:?}: {:+} -> {} bpm",
            reason,
            delta,
            bpm
        );
        Some(TempoChange { bpm, reason })
    }
}

fn normalize(value: u32, max: u32) -> f64 {
    if max == 0 {
        0.0
    } else {
        value as f64 / max as f64
    }
}

fn saturating_adjust(value: &mut u32, delta: i32, min: u32, max: u32) -> bool {
    let candidate = *value as i64 + delta as i64;
    if delta == 0 || candidate < min as i64 || candidate > max as i64 {
        return false;
    }
    *value = candidate as u32;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(bpm: f64) -> SessionClock {
        SessionClock::new(bpm, 5.0, 750.0, 8)
    }

    #[test]
    fn test_streak_pays_out_every_nth_success() {
        let mut controller = AdaptiveTempoController::new(&AdaptiveConfig::default());
        let mut clock = clock(100.0);

        assert!(controller.on_success(&mut clock).is_none());
        let change = controller.on_success(&mut clock).unwrap();
        assert_eq!(change.bpm, 101.0);
        assert_eq!(change.reason, TempoChangeReason::Streak);
        assert_eq!(controller.successes_in_a_row(), 0);
    }

    #[test]
    fn test_error_costs_tempo_and_resets_streak() {
        let mut controller = AdaptiveTempoController::new(&AdaptiveConfig::default());
        let mut clock = clock(100.0);

        controller.on_success(&mut clock);
        let change = controller.manage_adaptive_mechanics(&mut clock, true).unwrap();
        assert_eq!(change.bpm, 99.0);
        assert_eq!(controller.successes_in_a_row(), 0);

        // Streak starts over after the error
        assert!(controller.on_success(&mut clock).is_none());
        assert_eq!(clock.bpm(), 99.0);
    }

    #[test]
    fn test_requests_past_bounds_are_dropped() {
        let config = AdaptiveConfig {
            modification_frequency: 1,
            modification_step: 5,
            ..AdaptiveConfig::default()
        };
        let mut controller = AdaptiveTempoController::new(&config);

        let mut high = clock(748.0);
        assert!(controller.on_success(&mut high).is_none());
        assert_eq!(high.bpm(), 748.0);

        let mut low = clock(7.0);
        assert!(controller.on_error(&mut low).is_none());
        assert_eq!(low.bpm(), 7.0);
    }

    #[test]
    fn test_zero_step_never_changes_tempo() {
        let config = AdaptiveConfig {
            modification_step: 0,
            ..AdaptiveConfig::default()
        };
        let mut controller = AdaptiveTempoController::new(&config);
        let mut clock = clock(100.0);
        assert!(controller.on_error(&mut clock).is_none());
        assert_eq!(clock.bpm(), 100.0);
    }

    #[test]
    fn test_parameter_adjustments_saturate() {
        let mut controller = AdaptiveTempoController::new(&AdaptiveConfig::default());
        assert!(controller.adjust_frequency(-1));
        assert_eq!(controller.modification_frequency(), 1);
        assert!(!controller.adjust_frequency(-1));
        assert_eq!(controller.modification_frequency(), 1);

        for _ in 0..10 {
            controller.adjust_step(1);
        }
        assert_eq!(controller.modification_step(), 5);
        assert_eq!(controller.normalized_step(), 1.0);
        assert!((controller.normalized_frequency() - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_nudge_uses_configured_amount() {
        let controller = AdaptiveTempoController::new(&AdaptiveConfig::default());
        let mut clock = clock(100.0);
        assert_eq!(controller.nudge(&mut clock, -3).unwrap().bpm, 95.0);
        assert!(controller.nudge(&mut clock, 0).is_none());
    }
}
