use common::ErrorLocation;

use coordinator_core::error::CoreError;

use thiserror::Error;

/// Errors that stop the coordinator process from starting.
#[derive(Debug, Error)]
pub enum CoordinatorAppError {
    /// Config, bind, or runtime setup failed
    #[error("Startup Error: {message} {location}")]
    Startup {
        message: String,
        location: ErrorLocation,
    },

    /// Log directory or log file could not be set up
    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for CoordinatorAppError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        CoordinatorAppError::Startup {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}
