//! Stream-wide stop flag shared by every chunk of one download.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Raised once when any chunk fails for good. Blocking transfers poll the
/// flag; async waits (retry backoff) are woken through the `Notify`.
#[derive(Debug, Default)]
pub(crate) struct AbortSignal {
    raised: AtomicBool,
    notify: Notify,
}

impl AbortSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn raise(&self) {
        self.raised.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub(crate) fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Resolves once the signal is raised.
    pub(crate) async fn raised(&self) {
        // Register before checking the flag so a raise in between is not lost.
        let notified = self.notify.notified();
        if self.is_raised() {
            return;
        }
        notified.await;
    }

    /// Sleeps for `delay` unless the signal is raised first.
    pub(crate) async fn sleep(&self, delay: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.raised() => {}
        }
    }
}
