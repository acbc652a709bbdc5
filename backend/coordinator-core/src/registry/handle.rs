//! Opaque handles to managed streaming connections.
//!
//! A handle never touches the transport itself. The transport is owned by the
//! task reading its inbound stream; the handle only carries a bounded channel
//! through which that task is asked to close.

use crate::error::connection::ConnectionError;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Identity of one managed connection inside the registry.
pub type ConnectionId = Uuid;

/// Reason carried in the close frame of every coordinator-initiated close.
pub const CLOSE_REASON: &str = "Server shutting down";

/// Request delivered to a transport task asking it to close gracefully.
#[derive(Debug)]
pub struct CloseRequest {
    reason: &'static str,
    ack: oneshot::Sender<()>,
}

impl CloseRequest {
    pub fn reason(&self) -> &'static str {
        self.reason
    }

    /// Signal that the close frame went out (or failed) and the transport is released.
    pub fn acknowledge(self) {
        // The requester may have stopped waiting (drain does not wait for acks).
        let _ = self.ack.send(());
    }
}

/// Receiving end held by the task that owns the transport.
pub type CloseReceiver = mpsc::Receiver<CloseRequest>;

#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: String,
    close_tx: mpsc::Sender<CloseRequest>,
}

impl ConnectionHandle {
    /// Create a handle with a fresh id, plus the receiver its transport task listens on.
    pub fn new(peer: impl Into<String>) -> (Self, CloseReceiver) {
        let (close_tx, close_rx) = mpsc::channel(1);
        let handle = Self {
            id: Uuid::new_v4(),
            peer: peer.into(),
            close_tx,
        };
        (handle, close_rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Ask the owning transport task to send a close frame and release the transport.
    ///
    /// Never blocks. The returned receiver resolves once the task has acted on
    /// the request.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::CloseRequest`] when a close is already pending
    /// or the transport task has already exited.
    #[track_caller]
    pub fn request_close(
        &self,
        reason: &'static str,
    ) -> Result<oneshot::Receiver<()>, ConnectionError> {
        let (ack, ack_rx) = oneshot::channel();
        match self.close_tx.try_send(CloseRequest { reason, ack }) {
            Ok(()) => Ok(ack_rx),
            Err(TrySendError::Full(_)) => Err(ConnectionError::close_request(format!(
                "close already pending for connection {} ({})",
                self.id, self.peer
            ))),
            Err(TrySendError::Closed(_)) => Err(ConnectionError::close_request(format!(
                "transport for connection {} ({}) has already ended",
                self.id, self.peer
            ))),
        }
    }
}
