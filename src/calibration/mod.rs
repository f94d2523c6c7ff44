// Calibration module - initial tempo from a typing test
//
// This module provides two components:
// 1. TempoCalibration: collects keystroke instants and derives a tempo
// 2. CalibrationResult: the derived starting bpm, serializable for reuse
//
// The calibration workflow:
// 1. Create TempoCalibration from the tempo bounds
// 2. Record the instant of every keystroke of the test
// 3. Finish to obtain the clamped starting bpm

pub mod procedure;
pub mod state;

pub use procedure::{calibrate, TempoCalibration, MIN_PRESSES};
pub use state::CalibrationResult;
