//! One-shot deferred action enforcing the wall-clock timeout

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Runs an action once after a delay unless disarmed first
///
/// Disarming races benignly with firing: if the delay expires while
/// [`disarm`](Watchdog::disarm) is being called, the action may still run,
/// which is why the actions it triggers must be idempotent.
pub struct Watchdog {
    disarm_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<bool>>,
}

impl Watchdog {
    /// Schedule `action` to run after `delay`
    pub fn arm<F>(delay: Duration, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || match rx.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {
                debug!(delay_ms = delay.as_millis() as u64, "watchdog fired");
                action();
                true
            }
            // Explicit disarm, or the watchdog was dropped
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        });

        Self {
            disarm_tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Cancel the pending action and report whether it had already fired
    ///
    /// If the action is running at this moment, waits for it to return.
    pub fn disarm(mut self) -> bool {
        if let Some(tx) = self.disarm_tx.take() {
            let _ = tx.send(());
        }
        self.handle
            .take()
            .map(|handle| handle.join().unwrap_or(false))
            .unwrap_or(false)
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // Dropping the sender wakes the timer thread, which then exits
        self.disarm_tx.take();
    }
}
