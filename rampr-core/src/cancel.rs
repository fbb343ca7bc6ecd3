use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Cooperative cancellation handle for a run.
///
/// Virtual users check it between iterations; an in-flight request is allowed
/// to finish. The outer layer (CLI signal handler, embedding application)
/// holds a clone of the `Arc` and calls [`CancelToken::cancel`].
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once the token is cancelled. Used to cut pacing and
    /// inter-phase pauses short.
    ///
    /// The waiter is registered before the flag check, so a `cancel` landing
    /// between the two cannot be missed. Cancellation is one-shot, so a single
    /// wakeup is always final.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
