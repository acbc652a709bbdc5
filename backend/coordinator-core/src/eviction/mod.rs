//! Eviction engine: closes an exact count of connections on command, and
//! drains everything at shutdown.
//!
//! Closing is always graceful and always delegated: the engine asks each
//! connection's transport task to send a close frame, and the registry entry
//! is removed by whichever side gets there first (`remove` is idempotent).
//! Failures on individual connections are logged and absorbed.

mod shutdown;

pub use shutdown::{ShutdownSignal, ShutdownState};

use crate::config::EvictionConfig;
use crate::registry::{CLOSE_REASON, ConnectionHandle, ConnectionId, ConnectionRegistry};

use std::collections::HashSet;
use std::future::{Future, pending};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use log::{debug, error, info, warn};
use tokio::time::{MissedTickBehavior, interval, sleep, timeout};

/// How a drain ended. Every variant is a normal return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The registry reached zero.
    Drained,
    /// The timeout elapsed with connections still registered.
    TimedOut,
    /// The caller's cancellation future resolved first.
    Cancelled,
    /// Another drain had already started; this call only waited for it.
    AlreadyDraining,
}

#[derive(Debug)]
pub struct Evictor {
    registry: Arc<ConnectionRegistry>,
    shutdown: ShutdownSignal,
    close_ack_timeout: Duration,
    poll_interval: Duration,
}

impl Evictor {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        shutdown: ShutdownSignal,
        config: &EvictionConfig,
    ) -> Self {
        Self {
            registry,
            shutdown,
            close_ack_timeout: config.close_ack_timeout,
            poll_interval: config.drain_poll_interval,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn shutdown_state(&self) -> ShutdownState {
        self.shutdown.state()
    }

    /// Gracefully close up to `n` connections and deregister them.
    ///
    /// Returns the number actually closed: `min(n, size)` at selection time.
    pub async fn close_exactly(&self, n: usize) -> usize {
        let handles = self.registry.select_up_to(n).await;
        info!(
            "Closing WebSocket connections: requested={}, selected={}",
            n,
            handles.len()
        );

        let closed = handles.len();
        join_all(handles.into_iter().map(|handle| self.close_one(handle))).await;

        let remaining = self.registry.size().await;
        info!(
            "Closed {} WebSocket connections, {} remaining",
            closed, remaining
        );
        closed
    }

    async fn close_one(&self, handle: ConnectionHandle) {
        let id = handle.id();

        match handle.request_close(CLOSE_REASON) {
            Ok(ack) => match timeout(self.close_ack_timeout, ack).await {
                Ok(Ok(())) => debug!("WebSocket connection {} closed", id),
                Ok(Err(_)) => warn!(
                    "WebSocket connection {} ended before acknowledging close",
                    id
                ),
                Err(_) => warn!(
                    "Timed out after {:?} waiting for WebSocket connection {} to close",
                    self.close_ack_timeout, id
                ),
            },
            Err(e) => error!("Error sending close message: {}", e),
        }

        self.registry.remove(id).await;
    }

    /// Close every connection and wait up to `timeout` for the registry to empty.
    pub async fn drain_all(&self, timeout: Duration) -> DrainOutcome {
        self.drain_all_until(timeout, pending()).await
    }

    /// [`Evictor::drain_all`] that also stops waiting when `cancel` resolves.
    ///
    /// Leaves the shutdown state DRAINED. A call made while another drain runs
    /// waits for that drain to finish and returns
    /// [`DrainOutcome::AlreadyDraining`]; if `cancel` resolves first, the state
    /// may still be DRAINING.
    pub async fn drain_all_until<F>(&self, timeout: Duration, cancel: F) -> DrainOutcome
    where
        F: Future<Output = ()>,
    {
        if !self.shutdown.begin_drain() {
            warn!(
                "Drain requested while already {}, waiting for it to finish",
                self.shutdown.state()
            );
            tokio::select! {
                _ = self.shutdown.drained() => {}
                _ = cancel => {}
            }
            return DrainOutcome::AlreadyDraining;
        }

        let mut requested = HashSet::new();
        let count = self.request_close_unrequested(&mut requested).await;
        info!("Closing all WebSocket connections: count={}", count);

        let outcome = self.wait_until_empty(timeout, cancel, &mut requested).await;
        self.shutdown.finish_drain();
        outcome
    }

    /// Ask every registered connection not yet in `requested` to close.
    ///
    /// Acks are dropped: transport tasks deregister themselves and the drain
    /// watches the registry size instead.
    async fn request_close_unrequested(&self, requested: &mut HashSet<ConnectionId>) -> usize {
        let mut count = 0;
        for handle in self.registry.snapshot().await {
            if !requested.insert(handle.id()) {
                continue;
            }
            count += 1;
            if let Err(e) = handle.request_close(CLOSE_REASON) {
                error!("Error sending close message: {}", e);
            }
        }
        count
    }

    async fn wait_until_empty<F>(
        &self,
        limit: Duration,
        cancel: F,
        requested: &mut HashSet<ConnectionId>,
    ) -> DrainOutcome
    where
        F: Future<Output = ()>,
    {
        let deadline = sleep(limit);
        tokio::pin!(deadline);
        tokio::pin!(cancel);

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = &mut cancel => {
                    warn!("Cancelled while waiting for WebSocket connections to close");
                    return DrainOutcome::Cancelled;
                }
                _ = &mut deadline => {
                    let remaining = self.registry.size().await;
                    warn!(
                        "Timeout waiting for WebSocket connections to close, {} remaining",
                        remaining
                    );
                    return DrainOutcome::TimedOut;
                }
                _ = ticker.tick() => {
                    let remaining = self.registry.size().await;
                    if remaining == 0 {
                        info!("All WebSocket connections closed");
                        return DrainOutcome::Drained;
                    }

                    // Handshakes already in flight when the drain began can
                    // still register; they are asked to close here.
                    let late = self.request_close_unrequested(requested).await;
                    if late > 0 {
                        info!("Closing {} WebSocket connections registered during drain", late);
                    }
                    debug!("Waiting for {} WebSocket connections to close", remaining);
                }
            }
        }
    }
}
