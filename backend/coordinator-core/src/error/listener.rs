use common::ErrorLocation;

use std::io::Error as IoError;

use thiserror::Error as ThisError;

/// Listener-level failures. A bind failure is fatal to the listener that hit it.
#[derive(Debug, ThisError)]
pub enum ListenerError {
    #[error("Bind Error: {endpoint}: {source} {location}")]
    Bind {
        endpoint: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Accept Error: {endpoint}: {source} {location}")]
    Accept {
        endpoint: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },
}

impl ListenerError {
    #[track_caller]
    pub fn bind(endpoint: impl Into<String>, source: IoError) -> Self {
        ListenerError::Bind {
            endpoint: endpoint.into(),
            location: ErrorLocation::caller(),
            source,
        }
    }

    #[track_caller]
    pub fn accept(endpoint: impl Into<String>, source: IoError) -> Self {
        ListenerError::Accept {
            endpoint: endpoint.into(),
            location: ErrorLocation::caller(),
            source,
        }
    }
}
