// CalibrationResult - outcome of the initial-tempo typing test

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::SessionError;

/// Starting tempo derived from a typing test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Starting bpm after clamping into the tempo bounds
    pub bpm: f64,
    /// Mean seconds per keystroke before clamping
    pub tempo: f64,
    /// Keystrokes the measurement was taken from
    pub presses: usize,
    /// Whether the measured bpm fell outside the bounds
    pub clamped: bool,
}

impl CalibrationResult {
    /// Save the result as JSON so later sessions can start from it
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(self).map_err(|err| SessionError::Io {
            details: err.to_string(),
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load a previously saved result
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|err| SessionError::Io {
            details: err.to_string(),
        })
    }
}
