//! Task scheduling and shutdown coordination.
//!
//! shill's original event dispatcher is a single-threaded message loop that
//! owns every posted task and delayed task, so destroying an object
//! implicitly cancels its pending work. Tokio gives every task its own
//! lifetime instead, so here that implicit cancellation becomes explicit:
//! every task posted through an `EventDispatcher` is a child of its
//! [`CancellationToken`], and dropping (or calling [`EventDispatcher::shutdown`]
//! on) the dispatcher cancels everything still in flight.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Schedules immediate and delayed work, and cancels it all on shutdown.
///
/// Cloning an `EventDispatcher` shares the same cancellation scope: every
/// clone's posted tasks are cancelled together.
#[derive(Clone)]
pub struct EventDispatcher {
    token: CancellationToken,
}

impl EventDispatcher {
    /// Creates a new dispatcher with a fresh cancellation scope.
    #[must_use]
    pub fn new() -> Self {
        Self { token: CancellationToken::new() }
    }

    /// Posts a task to run as soon as the runtime schedules it.
    ///
    /// The returned handle resolves to `None` if the dispatcher is shut
    /// down before the task completes, `Some(output)` otherwise.
    pub fn post<F>(&self, task: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let child = self.token.child_token();
        tokio::spawn(async move {
            tokio::select! {
                () = child.cancelled() => None,
                output = task => Some(output),
            }
        })
    }

    /// Posts a task to run after `delay`, unless cancelled first.
    pub fn post_delayed<F>(&self, delay: Duration, task: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let child = self.token.child_token();
        tokio::spawn(async move {
            tokio::select! {
                () = child.cancelled() => None,
                () = tokio::time::sleep(delay) => Some(task.await),
            }
        })
    }

    /// Returns a token that cancels when this dispatcher shuts down, for
    /// components that need to run their own `tokio::select!` loop rather
    /// than a single posted task (see
    /// [`crate::portal_detector::PortalDetector`] and
    /// [`crate::modem_manager_watcher::ModemManagerWatcher`]).
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Cancels every task posted through this dispatcher (or any clone of
    /// it, or any child token handed out by [`EventDispatcher::child_token`]).
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Returns `true` if [`EventDispatcher::shutdown`] has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;

    #[tokio::test]
    async fn post_runs_task() {
        let dispatcher = EventDispatcher::new();
        let handle = dispatcher.post(async { 42 });
        assert_eq!(handle.await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn shutdown_cancels_delayed_task() {
        let dispatcher = EventDispatcher::new();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();

        let handle = dispatcher.post_delayed(Duration::from_secs(60), async move {
            ran_clone.store(true, Ordering::SeqCst);
        });

        dispatcher.shutdown();
        assert_eq!(handle.await.unwrap(), None);
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn child_token_cancels_on_shutdown() {
        let dispatcher = EventDispatcher::new();
        let child = dispatcher.child_token();
        assert!(!child.is_cancelled());
        dispatcher.shutdown();
        assert!(child.is_cancelled());
        assert!(dispatcher.is_shutdown());
    }
}
