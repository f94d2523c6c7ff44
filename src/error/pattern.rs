// Pattern catalog and schedule error types

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Pattern error code constants
///
/// Error code range: 2001-2004
pub struct PatternErrorCodes {}

impl PatternErrorCodes {
    /// The day schedule has no entries
    pub const EMPTY_SCHEDULE: i32 = 2001;

    /// A schedule entry points outside the catalog
    pub const UNKNOWN_PATTERN_INDEX: i32 = 2002;

    /// A pattern does not have exactly 24 slots
    pub const INVALID_PATTERN_LENGTH: i32 = 2003;

    /// A pattern slot holds a value that is not a known kind
    pub const INVALID_KIND: i32 = 2004;
}

/// Log a pattern error with structured context
pub fn log_pattern_error(err: &PatternError, context: &str) {
    error!(
        "Pattern error in {}: code={}, component=PatternLibrary, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while building the pattern library
///
/// All of these are fatal at startup; none can occur once a session runs.
///
/// Error code range: 2001-2004
#[derive(Debug, Clone, PartialEq)]
pub enum PatternError {
    /// The day schedule has no entries
    EmptySchedule,

    /// Schedule entry at `position` references a catalog index that does not exist
    UnknownPatternIndex {
        position: usize,
        index: usize,
        catalog_len: usize,
    },

    /// Pattern supplied with the wrong number of slots
    InvalidPatternLength { expected: usize, actual: usize },

    /// Raw slot value is not one of the four kinds
    InvalidKind { value: u8 },
}

impl ErrorCode for PatternError {
    fn code(&self) -> i32 {
        match self {
            PatternError::EmptySchedule => PatternErrorCodes::EMPTY_SCHEDULE,
            PatternError::UnknownPatternIndex { .. } => PatternErrorCodes::UNKNOWN_PATTERN_INDEX,
            PatternError::InvalidPatternLength { .. } => PatternErrorCodes::INVALID_PATTERN_LENGTH,
            PatternError::InvalidKind { .. } => PatternErrorCodes::INVALID_KIND,
        }
    }

    fn message(&self) -> String {
        match self {
            PatternError::EmptySchedule => "Day schedule is empty".to_string(),
            PatternError::UnknownPatternIndex {
                position,
                index,
                catalog_len,
            } => format!(
                "Schedule entry {} references pattern {} but the catalog has {} patterns",
                position, index, catalog_len
            ),
            PatternError::InvalidPatternLength { expected, actual } => {
                format!("Pattern must have {} slots (got {})", expected, actual)
            }
            PatternError::InvalidKind { value } => {
                format!("Unknown rhythmic kind value {}", value)
            }
        }
    }
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PatternError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PatternError {}
