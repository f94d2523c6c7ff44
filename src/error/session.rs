// Session error types and constants

use crate::error::{ErrorCode, PatternError};
use log::error;
use std::fmt;

/// Session error code constants
///
/// Single source of truth for the numeric codes reported by [`SessionError`].
///
/// Error code range: 1001-1008
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// Requested bpm is not a finite positive value inside the configured bounds
    pub const INVALID_BPM: i32 = 1001;

    /// Session is already running
    pub const ALREADY_RUNNING: i32 = 1002;

    /// Session is not running
    pub const NOT_RUNNING: i32 = 1003;

    /// Keystroke queue is full; the scheduler thread is not draining it
    pub const INPUT_QUEUE_FULL: i32 = 1004;

    /// A command or verdict channel was closed
    pub const CHANNEL_CLOSED: i32 = 1005;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1006;

    /// Filesystem error while persisting round data
    pub const IO: i32 = 1007;

    /// The pattern schedule could not be loaded
    pub const PATTERN_SCHEDULE: i32 = 1008;
}

/// Log a session error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=SessionHandle, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Session lifecycle errors
///
/// These errors cover starting and stopping the scheduler thread, feeding it
/// input, and persisting round exports.
///
/// Error code range: 1001-1008
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Requested bpm is not usable as a starting tempo
    InvalidBpm { bpm: f64 },

    /// Session is already running
    AlreadyRunning,

    /// Session is not running
    NotRunning,

    /// Keystroke ring buffer is full
    InputQueueFull { capacity: usize },

    /// A channel to the scheduler thread was closed
    ChannelClosed { channel: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Filesystem error
    Io { details: String },

    /// Pattern schedule failed validation at startup
    PatternSchedule { source: PatternError },
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::InvalidBpm { .. } => SessionErrorCodes::INVALID_BPM,
            SessionError::AlreadyRunning => SessionErrorCodes::ALREADY_RUNNING,
            SessionError::NotRunning => SessionErrorCodes::NOT_RUNNING,
            SessionError::InputQueueFull { .. } => SessionErrorCodes::INPUT_QUEUE_FULL,
            SessionError::ChannelClosed { .. } => SessionErrorCodes::CHANNEL_CLOSED,
            SessionError::LockPoisoned { .. } => SessionErrorCodes::LOCK_POISONED,
            SessionError::Io { .. } => SessionErrorCodes::IO,
            SessionError::PatternSchedule { .. } => SessionErrorCodes::PATTERN_SCHEDULE,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::InvalidBpm { bpm } => {
                format!("BPM must be finite and inside the configured bounds (got {})", bpm)
            }
            SessionError::AlreadyRunning => {
                "Session already running. Call stop() first.".to_string()
            }
            SessionError::NotRunning => "Session not running. Call start() first.".to_string(),
            SessionError::InputQueueFull { capacity } => {
                format!("Keystroke queue full (capacity {})", capacity)
            }
            SessionError::ChannelClosed { channel } => {
                format!("Channel closed: {}", channel)
            }
            SessionError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
            SessionError::Io { details } => format!("I/O error: {}", details),
            SessionError::PatternSchedule { source } => {
                format!("Pattern schedule rejected: {}", source.message())
            }
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io {
            details: err.to_string(),
        }
    }
}

impl From<PatternError> for SessionError {
    fn from(err: PatternError) -> Self {
        SessionError::PatternSchedule { source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_codes() {
        assert_eq!(SessionError::InvalidBpm { bpm: 0.0 }.code(), 1001);
        assert_eq!(SessionError::AlreadyRunning.code(), 1002);
        assert_eq!(SessionError::NotRunning.code(), 1003);
        assert_eq!(SessionError::InputQueueFull { capacity: 4 }.code(), 1004);
        assert_eq!(
            SessionError::ChannelClosed {
                channel: "verdict".to_string()
            }
            .code(),
            1005
        );
        assert_eq!(
            SessionError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            1006
        );
        assert_eq!(
            SessionError::Io {
                details: "disk".to_string()
            }
            .code(),
            1007
        );
        assert_eq!(
            SessionError::PatternSchedule {
                source: PatternError::EmptySchedule
            }
            .code(),
            1008
        );
    }

    #[test]
    fn test_session_error_messages() {
        let err = SessionError::InputQueueFull { capacity: 256 };
        assert!(err.message().contains("256"));

        let err = SessionError::AlreadyRunning;
        assert!(err.message().contains("already running"));

        let display = format!("{}", SessionError::NotRunning);
        assert!(display.starts_with("SessionError::NotRunning (code 1003)"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read only");
        let err: SessionError = io_err.into();

        match err {
            SessionError::Io { details } => assert!(details.contains("read only")),
            other => panic!("Expected Io variant, got {:?}", other),
        }
    }

    #[test]
    fn test_pattern_error_conversion_keeps_source() {
        let err: SessionError = PatternError::UnknownPatternIndex {
            position: 3,
            index: 99,
            catalog_len: 74,
        }
        .into();
        assert!(err.message().contains("99"));
    }
}
