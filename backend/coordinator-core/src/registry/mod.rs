//! Registry of live managed connections.
//!
//! One `RwLock` guards both the connection map and the threshold trigger:
//! `add`/`remove` take it exclusively, `size`/`select_up_to` share it. The
//! registry is built once by the composition root and passed around behind an
//! `Arc`; there is no global instance.

mod handle;
pub(crate) mod trigger;

pub use handle::{
    CLOSE_REASON, CloseReceiver, CloseRequest, ConnectionHandle, ConnectionId,
};
pub use trigger::{TriggerState, TriggerWaiter};

use trigger::ThresholdTrigger;

use std::collections::HashMap;

use log::{info, warn};
use tokio::sync::RwLock;

/// What a single [`ConnectionRegistry::add`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// `false` when a handle with the same id was already present.
    pub inserted: bool,
    /// Registry size right after the call.
    pub size: usize,
    /// `true` only for the one add that fired the threshold trigger.
    pub fired_trigger: bool,
}

#[derive(Debug)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    trigger: ThresholdTrigger,
}

#[derive(Debug)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
    trigger_waiter: TriggerWaiter,
    capacity: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry whose trigger fires when `capacity` connections are live.
    pub fn new(capacity: usize) -> Self {
        let (trigger, trigger_waiter) = ThresholdTrigger::new(capacity);
        Self {
            inner: RwLock::new(RegistryInner {
                connections: HashMap::new(),
                trigger,
            }),
            trigger_waiter,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert a handle; fires the trigger if this insert is the first to reach capacity.
    ///
    /// Firing only notifies waiters. It never closes connections and never
    /// blocks the caller.
    pub async fn add(&self, handle: ConnectionHandle) -> AddOutcome {
        let mut inner = self.inner.write().await;
        let id = handle.id();

        if inner.connections.contains_key(&id) {
            warn!("WebSocket connection {} already registered", id);
            return AddOutcome {
                inserted: false,
                size: inner.connections.len(),
                fired_trigger: false,
            };
        }

        inner.connections.insert(id, handle);
        let size = inner.connections.len();
        info!("WebSocket connection added: id={}, total={}", id, size);

        let fired_trigger = inner.trigger.observe(size);
        if fired_trigger {
            info!(
                "Reached {} WebSocket connections, threshold trigger fired",
                self.capacity
            );
        }

        AddOutcome {
            inserted: true,
            size,
            fired_trigger,
        }
    }

    /// Remove a handle by id. Absent ids are a silent no-op.
    ///
    /// Returns whether a handle was actually removed.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        let mut inner = self.inner.write().await;
        let removed = inner.connections.remove(&id).is_some();
        if removed {
            info!(
                "WebSocket connection removed: id={}, total={}",
                id,
                inner.connections.len()
            );
        }
        removed
    }

    /// Up to `n` handles from the current set, in no particular order. Does not mutate.
    pub async fn select_up_to(&self, n: usize) -> Vec<ConnectionHandle> {
        let inner = self.inner.read().await;
        inner.connections.values().take(n).cloned().collect()
    }

    /// Every handle currently registered.
    pub async fn snapshot(&self) -> Vec<ConnectionHandle> {
        let inner = self.inner.read().await;
        inner.connections.values().cloned().collect()
    }

    pub async fn size(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.inner.read().await.connections.contains_key(&id)
    }

    pub async fn trigger_state(&self) -> TriggerState {
        self.inner.read().await.trigger.state()
    }

    /// A waiter for the threshold trigger. Does not take the registry lock.
    pub fn trigger(&self) -> TriggerWaiter {
        self.trigger_waiter.clone()
    }
}
