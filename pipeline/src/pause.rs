//! Pause/resume/stop (§4.4 and §5). Pausing parks new operations at the
//! DEQUEUE stage; already-admitted operations downstream of DEQUEUE run to
//! completion undisturbed. An optional "shedding" mode swaps in
//! SERVICE_UNAVAILABLE for parked operations instead of holding them,
//! matching "an alternate shedding terminal may be swapped in". Stop is
//! resume + drain, handled by [`crate::pipeline::Pipeline::stop`] rather
//! than here — this type only owns the pause/shed flags.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pel_core::concurrency::Signal;

struct Inner {
    paused: AtomicBool,
    shedding: AtomicBool,
    signal: Signal,
}

#[derive(Clone)]
pub struct PauseGate(Arc<Inner>);

impl PauseGate {
    pub fn new() -> Self {
        PauseGate(Arc::new(Inner {
            paused: AtomicBool::new(false),
            shedding: AtomicBool::new(false),
            signal: Signal::new(),
        }))
    }

    pub fn pause(&self) {
        self.0.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.0.paused.store(false, Ordering::SeqCst);
        self.0.shedding.store(false, Ordering::SeqCst);
        self.0.signal.notify_all();
    }

    pub fn enable_shedding(&self) {
        self.0.shedding.store(true, Ordering::SeqCst);
        self.0.signal.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.0.paused.load(Ordering::SeqCst)
    }

    /// Blocks while paused and not shedding. Returns `true` if the caller
    /// should shed (bind SERVICE_UNAVAILABLE and stop) rather than proceed,
    /// `false` if it's clear to proceed into DEQUEUE.
    pub async fn wait_until_resumed_or_shed(&self) -> bool {
        loop {
            if !self.0.paused.load(Ordering::SeqCst) {
                return false;
            }
            if self.0.shedding.load(Ordering::SeqCst) {
                return true;
            }
            self.0.signal.wait().await;
        }
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn not_paused_proceeds_immediately() {
        let gate = PauseGate::new();
        assert!(!gate.wait_until_resumed_or_shed().await);
    }

    #[tokio::test]
    async fn paused_without_shedding_blocks_until_resume() {
        let gate = PauseGate::new();
        gate.pause();
        let gate2 = gate.clone();
        let waiter = tokio::spawn(async move { gate2.wait_until_resumed_or_shed().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        gate.resume();
        let should_shed = tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .expect("resume should wake the waiter")
            .unwrap();
        assert!(!should_shed);
    }

    #[tokio::test]
    async fn paused_with_shedding_returns_true_without_waiting() {
        let gate = PauseGate::new();
        gate.pause();
        gate.enable_shedding();
        let shed = tokio::time::timeout(Duration::from_millis(50), gate.wait_until_resumed_or_shed())
            .await
            .expect("shedding mode should not block");
        assert!(shed);
    }
}
