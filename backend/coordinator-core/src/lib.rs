pub mod command;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod eviction;
pub mod registry;
pub mod websocket;

#[cfg(test)]
mod tests;

pub use coordinator::{Coordinator, CoordinatorHandle};

use std::time::Duration;

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_WEBSOCKET_PORT: u16 = 8080;
pub const DEFAULT_COMMAND_PORT: u16 = 9999;
pub const DEFAULT_WEBSOCKET_ADDR: &str =
    const_format::concatcp!(DEFAULT_BIND_HOST, ":", DEFAULT_WEBSOCKET_PORT);
pub const DEFAULT_COMMAND_ADDR: &str =
    const_format::concatcp!(DEFAULT_BIND_HOST, ":", DEFAULT_COMMAND_PORT);
pub const DEFAULT_LOCAL_SOCKET_PATH: &str = "/tmp/ipc.sock";
pub const DEFAULT_CAPACITY: usize = 100;

/// Pause after a failed `accept()` so a persistent failure (EMFILE) does not spin.
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);
