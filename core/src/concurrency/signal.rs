//! Condition-variable-style signal: waiters block until `notify` wakes one
//! of them or `notify_all` wakes all of them, with optional timed waits.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;

pub struct Signal {
    waiters: Mutex<VecDeque<oneshot::Sender<()>>>,
}

impl Signal {
    pub fn new() -> Self {
        Self {
            waiters: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait indefinitely for a `notify`/`notify_all`.
    pub async fn wait(&self) {
        let acquired = self.wait_timeout(None).await;
        debug_assert!(acquired);
    }

    /// Wait up to `timeout` (or forever if `None`) for a `notify`/`notify_all`.
    /// Returns `false` if the timeout elapsed first.
    pub async fn wait_timeout(&self, timeout: Option<Duration>) -> bool {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().unwrap().push_back(tx);

        match timeout {
            None => rx.await.is_ok(),
            Some(d) => matches!(tokio::time::timeout(d, rx).await, Ok(Ok(()))),
        }
    }

    /// Wake the single longest-waiting waiter, if any.
    pub fn notify(&self) {
        let mut waiters = self.waiters.lock().unwrap();
        while let Some(tx) = waiters.pop_front() {
            if tx.send(()).is_ok() {
                return;
            }
        }
    }

    /// Wake every currently-queued waiter.
    pub fn notify_all(&self) {
        let mut waiters = self.waiters.lock().unwrap();
        for tx in waiters.drain(..) {
            let _ = tx.send(());
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
