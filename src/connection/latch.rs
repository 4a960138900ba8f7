//! Single-assignment latch gating frame delivery until `on_open` has returned.
//!
//! Frames can arrive in the same tick as connection-open; the dispatcher waits
//! on this latch before its first delivery so the application has recorded the
//! connection reference before any `on_message` runs. Not a thread-blocking
//! countdown: waiting is an async single-assignment signal.

use tokio::sync::watch;

/// A one-shot open signal. Cheap to clone; releasing any clone releases all.
#[derive(Debug, Clone)]
pub struct OpenLatch {
    released: watch::Sender<bool>,
}

impl OpenLatch {
    /// Create an unreleased latch.
    #[must_use]
    pub fn new() -> Self {
        let (released, _) = watch::channel(false);
        Self { released }
    }

    /// Release the latch, waking all waiters. Idempotent.
    pub fn release(&self) {
        self.released.send_replace(true);
    }

    /// Whether the latch has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        *self.released.borrow()
    }

    /// Wait for the latch to be released. A no-op once released.
    pub async fn wait(&self) {
        let mut rx = self.released.subscribe();
        let _ = rx.wait_for(|released| *released).await;
    }
}

impl Default for OpenLatch {
    fn default() -> Self {
        Self::new()
    }
}
