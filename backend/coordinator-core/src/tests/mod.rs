// Unit tests for coordinator-core internals.
// Public API tests over real sockets are in integration_tests/.

mod eviction;
mod trigger;

use crate::config::EvictionConfig;
use crate::eviction::{Evictor, ShutdownSignal};
use crate::registry::{CloseReceiver, ConnectionHandle, ConnectionId, ConnectionRegistry};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Eviction timings short enough for tests.
pub(crate) fn fast_eviction_config() -> EvictionConfig {
    EvictionConfig {
        close_ack_timeout: Duration::from_millis(100),
        drain_timeout: Duration::from_millis(500),
        drain_poll_interval: Duration::from_millis(10),
    }
}

pub(crate) fn evictor_for(registry: &Arc<ConnectionRegistry>) -> Evictor {
    Evictor::new(
        Arc::clone(registry),
        ShutdownSignal::new(),
        &fast_eviction_config(),
    )
}

/// Stand-in for a transport task: waits for a close request, acknowledges it,
/// and deregisters itself the way the WebSocket task does.
pub(crate) fn spawn_fake_transport(
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
    mut close_rx: CloseReceiver,
) -> JoinHandle<bool> {
    tokio::spawn(async move {
        let request = close_rx.recv().await;
        let evicted = request.is_some();
        if let Some(request) = request {
            request.acknowledge();
        }
        registry.remove(id).await;
        evicted
    })
}

/// Register `count` handles backed by cooperative fake transports.
pub(crate) async fn register_cooperative(
    registry: &Arc<ConnectionRegistry>,
    count: usize,
) -> Vec<JoinHandle<bool>> {
    let mut transports = Vec::with_capacity(count);
    for i in 0..count {
        let (handle, close_rx) = ConnectionHandle::new(format!("fake-{i}"));
        let id = handle.id();
        registry.add(handle).await;
        transports.push(spawn_fake_transport(Arc::clone(registry), id, close_rx));
    }
    transports
}

/// Register `count` handles whose transports never answer. The receivers are
/// returned so the channels stay open.
pub(crate) async fn register_unresponsive(
    registry: &ConnectionRegistry,
    count: usize,
) -> Vec<CloseReceiver> {
    let mut receivers = Vec::with_capacity(count);
    for i in 0..count {
        let (handle, close_rx) = ConnectionHandle::new(format!("stuck-{i}"));
        registry.add(handle).await;
        receivers.push(close_rx);
    }
    receivers
}
