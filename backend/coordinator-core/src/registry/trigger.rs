//! One-shot capacity trigger.
//!
//! The trigger lives inside the registry lock, so the ARMED -> FIRED check and
//! the size that caused it are observed atomically. Waiters hold a
//! [`TriggerWaiter`] outside the lock and never contend with `add`/`remove`.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Armed,
    Fired,
}

#[derive(Debug)]
pub(crate) struct ThresholdTrigger {
    capacity: usize,
    state: TriggerState,
    signal: watch::Sender<TriggerState>,
}

impl ThresholdTrigger {
    pub(crate) fn new(capacity: usize) -> (Self, TriggerWaiter) {
        let (signal, rx) = watch::channel(TriggerState::Armed);
        let trigger = Self {
            capacity,
            state: TriggerState::Armed,
            signal,
        };
        (trigger, TriggerWaiter { rx })
    }

    pub(crate) fn state(&self) -> TriggerState {
        self.state
    }

    /// Fire if still armed and `size` has reached capacity.
    ///
    /// Returns `true` only for the call that performed the transition. The
    /// state check happens before the signal is touched, so the watch value
    /// changes exactly once.
    pub(crate) fn observe(&mut self, size: usize) -> bool {
        if self.state == TriggerState::Fired || size < self.capacity {
            return false;
        }

        self.state = TriggerState::Fired;
        self.signal.send_replace(TriggerState::Fired);
        true
    }
}

/// Read side of the trigger; cheap to clone, any number of waiters.
#[derive(Debug, Clone)]
pub struct TriggerWaiter {
    rx: watch::Receiver<TriggerState>,
}

impl TriggerWaiter {
    pub fn is_fired(&self) -> bool {
        *self.rx.borrow() == TriggerState::Fired
    }

    /// Wait until the trigger fires.
    ///
    /// Returns `false` if the registry owning the trigger was dropped while
    /// still armed.
    pub async fn fired(&self) -> bool {
        let mut rx = self.rx.clone();
        rx.wait_for(|state| *state == TriggerState::Fired)
            .await
            .is_ok()
    }
}
