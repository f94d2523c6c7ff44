// TempoCalibration - keystroke collection for the initial tempo
//
// The player types freely for a while; the mean time per keystroke becomes
// the starting tempo. The mean divides the total span by the number of
// presses, not the number of gaps, which biases the result slightly slower.

use crate::calibration::state::CalibrationResult;
use crate::config::TempoConfig;
use crate::error::{log_calibration_error, CalibrationError};

/// Keystrokes needed before a tempo can be derived
pub const MIN_PRESSES: usize = 2;

/// Collects keystroke instants and derives a starting bpm
#[derive(Debug, Clone)]
pub struct TempoCalibration {
    instants: Vec<f64>,
    min_bpm: f64,
    max_bpm: f64,
    result: Option<CalibrationResult>,
}

impl TempoCalibration {
    /// Create a calibration clamping into `[min_bpm, max_bpm]`
    pub fn new(min_bpm: f64, max_bpm: f64) -> Self {
        Self {
            instants: Vec::new(),
            min_bpm,
            max_bpm,
            result: None,
        }
    }

    pub fn from_config(config: &TempoConfig) -> Self {
        Self::new(config.min_bpm, config.max_bpm)
    }

    /// Record one keystroke
    ///
    /// # Arguments
    /// * `instant` - Seconds since the test started
    ///
    /// # Returns
    /// Number of keystrokes recorded so far
    ///
    /// # Errors
    /// - `AlreadyComplete` once `finish` has produced a result
    /// - `NonMonotonic` if `instant` is not later than the previous keystroke
    pub fn record(&mut self, instant: f64) -> Result<usize, CalibrationError> {
        if self.result.is_some() {
            return Err(CalibrationError::AlreadyComplete);
        }
        if let Some(&last) = self.instants.last() {
            if instant <= last {
                return Err(CalibrationError::NonMonotonic {
                    index: self.instants.len(),
                });
            }
        }
        self.instants.push(instant);
        Ok(self.instants.len())
    }

    pub fn presses(&self) -> usize {
        self.instants.len()
    }

    pub fn result(&self) -> Option<CalibrationResult> {
        self.result
    }

    /// Derive the starting tempo from the recorded keystrokes
    ///
    /// # Errors
    /// - `InsufficientSamples` with fewer than [`MIN_PRESSES`] keystrokes
    /// - `AlreadyComplete` if called twice
    pub fn finish(&mut self) -> Result<CalibrationResult, CalibrationError> {
        if self.result.is_some() {
            return Err(CalibrationError::AlreadyComplete);
        }
        let (first, last) = match (self.instants.first(), self.instants.last()) {
            (Some(&first), Some(&last)) if self.instants.len() >= MIN_PRESSES => (first, last),
            _ => {
                let err = CalibrationError::InsufficientSamples {
                    required: MIN_PRESSES,
                    collected: self.instants.len(),
                };
                log_calibration_error(&err, "TempoCalibration::finish");
                return Err(err);
            }
        };

        let presses = self.instants.len();
        let tempo = (last - first) / presses as f64;
        let measured = 60.0 / tempo;
        let bpm = measured.clamp(self.min_bpm, self.max_bpm);
        let result = CalibrationResult {
            bpm,
            tempo,
            presses,
            clamped: bpm != measured,
        };

        log::info!(
            "[TempoCalibration] {} presses over {:.3}s -> {:.1} bpm{}",
            presses,
            last - first,
            bpm,
            if result.clamped { " (clamped)" } else { "" }
        );
        self.result = Some(result);
        Ok(result)
    }
}

/// Run a whole calibration over already-captured instants
pub fn calibrate(instants: &[f64], config: &TempoConfig) -> Result<CalibrationResult, CalibrationError> {
    let mut calibration = TempoCalibration::from_config(config);
    for &instant in instants {
        calibration.record(instant)?;
    }
    calibration.finish()
}
