// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 3001-3003
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Not enough keystrokes recorded during the typing test
    pub const INSUFFICIENT_SAMPLES: i32 = 3001;

    /// Keystroke instants were not strictly increasing
    pub const NON_MONOTONIC: i32 = 3002;

    /// Calibration already finished; no further samples accepted
    pub const ALREADY_COMPLETE: i32 = 3003;
}

/// Log a calibration error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=TempoCalibration, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Initial-tempo calibration errors
///
/// Error code range: 3001-3003
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Insufficient keystrokes collected for calibration
    InsufficientSamples { required: usize, collected: usize },

    /// Keystroke at `index` is not later than its predecessor
    NonMonotonic { index: usize },

    /// Calibration already produced a tempo
    AlreadyComplete,
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::InsufficientSamples { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_SAMPLES
            }
            CalibrationError::NonMonotonic { .. } => CalibrationErrorCodes::NON_MONOTONIC,
            CalibrationError::AlreadyComplete => CalibrationErrorCodes::ALREADY_COMPLETE,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::InsufficientSamples {
                required,
                collected,
            } => {
                format!("Insufficient samples: need {}, got {}", required, collected)
            }
            CalibrationError::NonMonotonic { index } => {
                format!("Keystroke {} is not later than the previous one", index)
            }
            CalibrationError::AlreadyComplete => "Calibration already complete".to_string(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}
