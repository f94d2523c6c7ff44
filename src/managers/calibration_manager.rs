// CalibrationManager: thread-safe wrapper around the tempo typing test
//
// Single Responsibility: calibration lifecycle and the last calibrated tempo

use std::sync::{Mutex, MutexGuard};

use crate::calibration::{CalibrationResult, TempoCalibration};
use crate::config::TempoConfig;
use crate::error::{log_calibration_error, CalibrationError};

/// Manages the typing-test calibration shared between the input surface and
/// the session runtime
///
/// A finished calibration leaves its result behind; the session handle uses
/// it as the starting bpm of training sessions.
pub struct CalibrationManager {
    bounds: TempoConfig,
    procedure: Mutex<Option<TempoCalibration>>,
    result: Mutex<Option<CalibrationResult>>,
}

impl CalibrationManager {
    pub fn new(bounds: TempoConfig) -> Self {
        Self {
            bounds,
            procedure: Mutex::new(None),
            result: Mutex::new(None),
        }
    }

    /// Begin a new typing test, discarding any test in progress
    pub fn start(&self) {
        let mut guard = lock(&self.procedure);
        if guard.is_some() {
            log::warn!("[CalibrationManager] Restarting calibration in progress");
        }
        *guard = Some(TempoCalibration::from_config(&self.bounds));
    }

    /// Whether a typing test is collecting keystrokes
    pub fn is_active(&self) -> bool {
        lock(&self.procedure).is_some()
    }

    /// Record one keystroke of the running test
    ///
    /// # Errors
    /// - `AlreadyComplete` when no test is running
    /// - `NonMonotonic` for out-of-order instants
    pub fn record(&self, instant: f64) -> Result<usize, CalibrationError> {
        let mut guard = lock(&self.procedure);
        let procedure = guard.as_mut().ok_or(CalibrationError::AlreadyComplete)?;
        procedure.record(instant).inspect_err(|err| {
            log_calibration_error(err, "CalibrationManager::record");
        })
    }

    /// Finish the running test and keep its result
    ///
    /// The test ends even when it fails; a new one must be started.
    pub fn finish(&self) -> Result<CalibrationResult, CalibrationError> {
        let mut procedure = lock(&self.procedure)
            .take()
            .ok_or(CalibrationError::AlreadyComplete)?;
        let result = procedure.finish()?;
        *lock(&self.result) = Some(result);
        Ok(result)
    }

    /// Result of the last successful test
    pub fn result(&self) -> Option<CalibrationResult> {
        *lock(&self.result)
    }

    /// Install a result saved by an earlier session
    pub fn load_result(&self, result: CalibrationResult) {
        *lock(&self.result) = Some(result);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Default for CalibrationManager {
    fn default() -> Self {
        Self::new(TempoConfig::default())
    }
}
