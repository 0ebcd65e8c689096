//! The server-level ready flag (§4.6, §5): "accessed only by a single
//! writer at a time and read-compatible" — a plain atomic bool, cloned
//! cheaply behind an `Arc` so both the adapter's accept loop and whatever
//! readiness probe flips it share the same cell.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ReadyFlag(Arc<AtomicBool>);

impl ReadyFlag {
    /// Starts not-ready; a deployment flips this once startup (migrations,
    /// warmup, ...) has completed.
    pub fn new() -> Self {
        ReadyFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn set_ready(&self, ready: bool) {
        self.0.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_ready() {
        assert!(!ReadyFlag::new().is_ready());
    }

    #[test]
    fn reflects_last_write() {
        let flag = ReadyFlag::new();
        flag.set_ready(true);
        assert!(flag.is_ready());
        flag.set_ready(false);
        assert!(!flag.is_ready());
    }
}
