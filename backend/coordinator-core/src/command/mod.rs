//! Command channels: line-based control protocol for eviction requests.
//!
//! Two bindings share one command loop:
//!
//! - **Network** (TCP, default `:9999`): each peer first waits for the
//!   threshold trigger and receives a single `0x01` byte, then sends commands.
//! - **Local** (Unix socket, default `/tmp/ipc.sock`): commands are read
//!   immediately, no preamble.
//!
//! # Protocol
//!
//! Each command is an ASCII line `"<N>\n"`. The coordinator closes up to N
//! managed connections and answers `"Closing <N> WS connections\n"`. A line
//! that does not parse is logged and ignored; the channel stays open.

mod listener;
mod request;
mod server;
pub(crate) mod session;

#[cfg(unix)]
pub use listener::LocalCommandListener;
pub use listener::{CommandBinding, CommandListener, NetworkCommandListener};
pub use request::EvictionRequest;
#[cfg(unix)]
pub use server::start_local_command_server;
pub use server::{CommandServerHandle, serve_commands, start_network_command_server};
pub use session::{MAX_LINE_BYTES, START_SIGNAL};
