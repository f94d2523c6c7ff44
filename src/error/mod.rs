// Error types for the rhythm trainer engine
//
// This module defines custom error types for session lifecycle, pattern schedule
// validation and tempo calibration, each carrying a stable numeric code.

mod calibration;
mod pattern;
mod session;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use pattern::{log_pattern_error, PatternError, PatternErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the CLI and any embedding application.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
