//! Streaming transport: a thin WebSocket acceptor feeding the registry.
//!
//! This layer owns the handshake and the per-connection read loop. It hands
//! every upgraded connection to the [`ConnectionRegistry`](crate::registry::ConnectionRegistry)
//! and removes it again when the connection ends. Payloads are ignored.

mod connection;
mod server;

pub use server::{WebSocketServerHandle, start_websocket_server};
