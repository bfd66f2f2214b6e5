//! Resize debouncing
//!
//! Each viewer owns one [`ResizeDebouncer`]. Scheduling replaces whatever was
//! pending, so a burst of notifications collapses into one action that runs
//! after the quiet interval has passed since the last of them.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Quiet interval used when none is configured
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_millis(100);

pub struct ResizeDebouncer {
    quiet: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl ResizeDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: Mutex::new(None),
        }
    }

    /// Cancel the pending action, if any, and schedule `action` after the quiet interval.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let quiet = self.quiet;
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            action.await;
        }));
    }

    /// Drop the pending action without running it.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Default for ResizeDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_INTERVAL)
    }
}

impl Drop for ResizeDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
