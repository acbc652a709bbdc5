use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;

/// Failures while serving one command-channel connection.
///
/// `Malformed` keeps the channel open; every other variant ends it.
#[derive(Debug, ThisError)]
pub enum CommandError {
    #[error("Malformed Command: {input:?}: {reason} {location}")]
    Malformed {
        input: String,
        reason: String,
        location: ErrorLocation,
    },

    #[error("Line Too Long: exceeded {limit} bytes without a newline {location}")]
    LineTooLong {
        limit: usize,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("Write Error: {message} {location}")]
    Write {
        message: String,
        location: ErrorLocation,
    },
}

impl CommandError {
    #[track_caller]
    pub fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        CommandError::Malformed {
            input: input.into(),
            reason: reason.into(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn read(error: IoError) -> Self {
        CommandError::Read {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }

    #[track_caller]
    pub fn write(error: IoError) -> Self {
        CommandError::Write {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }

    /// Whether the command loop may keep reading after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CommandError::Malformed { .. })
    }
}
