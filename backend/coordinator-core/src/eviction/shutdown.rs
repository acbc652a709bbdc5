use std::fmt::{Display, Formatter, Result as FormatResult};
use std::sync::Arc;

use tokio::sync::watch;

/// Process-wide lifecycle of the coordinator. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Normal,
    Draining,
    Drained,
}

impl Display for ShutdownState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ShutdownState::Normal => "NORMAL",
            ShutdownState::Draining => "DRAINING",
            ShutdownState::Drained => "DRAINED",
        };
        formatter.write_str(name)
    }
}

/// Shared handle on the [`ShutdownState`].
///
/// Clones share the same state. Holders can await the NORMAL -> DRAINING
/// transition, which is how the WebSocket acceptor stops taking connections.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<ShutdownState>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ShutdownState::Normal);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> ShutdownState {
        *self.tx.borrow()
    }

    /// NORMAL -> DRAINING. Returns `false` if a drain already started.
    pub(crate) fn begin_drain(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == ShutdownState::Normal {
                *state = ShutdownState::Draining;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn finish_drain(&self) {
        self.tx.send_replace(ShutdownState::Drained);
    }

    /// Resolves once the state has left NORMAL.
    pub async fn draining(&self) {
        let mut rx = self.tx.subscribe();
        // `self` keeps the sender alive, so the wait cannot fail.
        let _ = rx
            .wait_for(|state| *state != ShutdownState::Normal)
            .await;
    }

    /// Resolves once the state is DRAINED.
    pub async fn drained(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|state| *state == ShutdownState::Drained).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
