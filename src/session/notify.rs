use std::sync::{Mutex, PoisonError};

/// User-facing notifications (toasts).
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
}

/// Buffers notifications until the UI drains them.
#[derive(Debug, Default)]
pub struct Toasts {
    pending: Mutex<Vec<String>>,
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every message queued so far.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for Toasts {
    fn success(&self, message: &str) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}
