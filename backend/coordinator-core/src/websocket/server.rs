use crate::ACCEPT_ERROR_BACKOFF;
use crate::error::connection::ConnectionError;
use crate::error::listener::ListenerError;
use crate::eviction::ShutdownSignal;
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::websocket::connection::{ConnectionEnd, serve_connection};

use common::ErrorLocation;

use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::accept_async;

/// Handle to the running WebSocket acceptor.
#[derive(Debug)]
pub struct WebSocketServerHandle {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl WebSocketServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting. Connections already registered keep running.
    pub fn stop(&self) {
        self.task.abort();
    }
}

/// Bind the streaming listener and start accepting WebSocket connections.
///
/// Every upgraded connection is registered with `registry` and deregisters
/// itself when it ends, for whatever reason. The acceptor stops taking new
/// connections once `shutdown` leaves NORMAL.
///
/// # Errors
///
/// Returns [`ListenerError::Bind`] if the address cannot be bound.
pub async fn start_websocket_server(
    bind_addr: &str,
    registry: Arc<ConnectionRegistry>,
    shutdown: ShutdownSignal,
) -> Result<WebSocketServerHandle, ListenerError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| ListenerError::bind(bind_addr, e))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| ListenerError::bind(bind_addr, e))?;

    info!("WebSocket server listening on {}", local_addr);

    let task = tokio::spawn(accept_loop(listener, registry, shutdown));

    Ok(WebSocketServerHandle { local_addr, task })
}

async fn accept_loop(
    listener: TcpListener,
    registry: Arc<ConnectionRegistry>,
    shutdown: ShutdownSignal,
) {
    loop {
        tokio::select! {
            _ = shutdown.draining() => {
                info!("Shutdown in progress, no longer accepting WebSocket connections");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let registry = Arc::clone(&registry);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, registry).await {
                            warn!("WebSocket connection from {} failed: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept WebSocket connection: {}", e);
                    sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }
}

/// Upgrade, register, serve, deregister.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
) -> Result<(), ConnectionError> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| ConnectionError::Handshake {
            message: format!("WebSocket handshake with {addr} failed: {e}"),
            location: ErrorLocation::caller(),
        })?;

    let (handle, close_rx) = ConnectionHandle::new(addr.to_string());
    let id = handle.id();
    registry.add(handle).await;

    let result = serve_connection(ws_stream, id, close_rx).await;

    // Eviction may already have removed it; removal is idempotent.
    registry.remove(id).await;

    match result? {
        ConnectionEnd::PeerClosed => info!("WebSocket client {} disconnected", addr),
        ConnectionEnd::Evicted => info!("WebSocket client {} evicted", addr),
    }
    Ok(())
}
