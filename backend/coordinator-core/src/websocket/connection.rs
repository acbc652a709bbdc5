//! Per-connection task for a managed WebSocket.
//!
//! The task is the only owner of the transport. It reads inbound frames until
//! the peer goes away, or until the eviction engine asks it to close.

use crate::error::connection::ConnectionError;
use crate::registry::{CLOSE_REASON, CloseReceiver, ConnectionId};

use common::ErrorLocation;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Why a connection task stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectionEnd {
    /// Peer sent a close frame or the stream ended.
    PeerClosed,
    /// Coordinator asked for the close (eviction or drain).
    Evicted,
}

/// Pump one WebSocket until either side closes it.
///
/// # Errors
///
/// Returns [`ConnectionError::Read`] if the inbound stream fails. Failures
/// while sending the close frame are logged, not returned.
pub(crate) async fn serve_connection(
    ws_stream: WebSocketStream<TcpStream>,
    id: ConnectionId,
    mut close_rx: CloseReceiver,
) -> Result<ConnectionEnd, ConnectionError> {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            request = close_rx.recv() => {
                // `None` means every handle was dropped: the registry already
                // forgot this connection, so close it the same way.
                let reason = request
                    .as_ref()
                    .map(|r| r.reason())
                    .unwrap_or(CLOSE_REASON);

                if let Err(e) = close_transport(&mut write, reason).await {
                    error!("Error closing WebSocket connection {}: {}", id, e);
                }
                if let Some(request) = request {
                    request.acknowledge();
                }
                return Ok(ConnectionEnd::Evicted);
            }
            message = read.next() => match message {
                Some(Ok(Message::Close(frame))) => {
                    debug!("WebSocket connection {} sent close: {:?}", id, frame);
                    // Flushes the queued close reply.
                    let _ = write.close().await;
                    return Ok(ConnectionEnd::PeerClosed);
                }
                Some(Ok(Message::Ping(_))) => {
                    // Pong is queued by tungstenite and goes out on flush.
                    if let Err(e) = write.flush().await {
                        debug!("Failed to flush pong on connection {}: {}", id, e);
                    }
                }
                Some(Ok(_)) => {
                    // Payloads carry no meaning for the coordinator.
                }
                Some(Err(e)) => {
                    return Err(ConnectionError::Read {
                        message: format!("WebSocket connection {} read failed: {}", id, e),
                        location: ErrorLocation::caller(),
                    });
                }
                None => {
                    info!("WebSocket connection {} stream ended", id);
                    return Ok(ConnectionEnd::PeerClosed);
                }
            }
        }
    }
}

/// Send a "going away" close frame, then close the sink.
async fn close_transport(write: &mut WsSink, reason: &'static str) -> Result<(), ConnectionError> {
    let frame = CloseFrame {
        code: CloseCode::Away,
        reason: reason.into(),
    };

    write
        .send(Message::Close(Some(frame)))
        .await
        .map_err(|e| ConnectionError::Send {
            message: format!("Error sending close message: {e}"),
            location: ErrorLocation::caller(),
        })?;

    write.close().await.map_err(|e| ConnectionError::Send {
        message: format!("Error closing WebSocket sink: {e}"),
        location: ErrorLocation::caller(),
    })
}
