use std::sync::Arc;
use tokio::sync::watch;

/// Number of requests currently in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusyState {
    pub in_flight: usize,
}

impl BusyState {
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }
}

/// Process-wide busy indicator.
///
/// A counter rather than a flag so overlapping requests keep it busy until the last one settles.
/// The `watch` sender owns the state; every change goes through `send_modify`, so increments and
/// decrements from different tasks are serialized. UI code subscribes instead of polling.
#[derive(Debug, Clone)]
pub struct BusyStore {
    state: Arc<watch::Sender<BusyState>>,
}

impl Default for BusyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BusyStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(BusyState::default());
        BusyStore {
            state: Arc::new(state),
        }
    }

    /// Mark one request as started. Busy until the returned guard is dropped.
    pub(crate) fn begin(&self) -> BusyGuard {
        self.state.send_modify(|s| s.in_flight += 1);
        #[cfg(feature = "tracing")]
        tracing::trace!(in_flight = self.state.borrow().in_flight, "request started");
        BusyGuard {
            state: self.state.clone(),
        }
    }

    pub fn snapshot(&self) -> BusyState {
        *self.state.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.snapshot().is_busy()
    }

    pub fn subscribe(&self) -> watch::Receiver<BusyState> {
        self.state.subscribe()
    }
}

/// Releases its request's busy slot exactly once, on drop.
#[derive(Debug)]
#[must_use = "the request stops counting as busy when the guard is dropped"]
pub struct BusyGuard {
    state: Arc<watch::Sender<BusyState>>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.in_flight = s.in_flight.saturating_sub(1));
        #[cfg(feature = "tracing")]
        tracing::trace!(in_flight = self.state.borrow().in_flight, "request settled");
    }
}
