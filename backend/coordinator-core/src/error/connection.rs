use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Failures on a single managed (streaming) connection.
///
/// None of these ever reach the caller of an eviction; the engine and the
/// transport task log them and treat the connection as gone.
#[derive(Debug, ThisError)]
pub enum ConnectionError {
    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("Close Request Error: {message} {location}")]
    CloseRequest {
        message: String,
        location: ErrorLocation,
    },
}

impl ConnectionError {
    #[track_caller]
    pub fn close_request(message: impl Into<String>) -> Self {
        ConnectionError::CloseRequest {
            message: message.into(),
            location: ErrorLocation::caller(),
        }
    }
}
