//! Per-stage concurrency: `Parallel` (no gate), `FixedConcurrency(N)` (a
//! plain FIFO gate reused from [`pel_core::concurrency::Semaphore`]), and
//! `PriorityFixed(N)` (the load-shedder's admission gate, §4.4).

use std::sync::Arc;

use pel_core::concurrency::Semaphore;

use crate::load_shedding::PrioritySemaphore;

/// How many operations may be inside one stage's transform at once.
#[derive(Clone)]
pub enum ConcurrencyMode {
    /// Unbounded in-flight; backpressure comes only from downstream stages.
    Parallel,
    /// At most `N` concurrently; additional operations block before
    /// entering the transform, which is how backpressure propagates
    /// upstream (the task holding an earlier stage simply doesn't finish).
    FixedConcurrency(Arc<Semaphore>),
    /// As `FixedConcurrency`, but when a slot frees, the highest-priority
    /// waiter is admitted first (FIFO among equal priorities).
    PriorityFixed(Arc<PrioritySemaphore>),
}

impl ConcurrencyMode {
    pub fn fixed(limit: usize) -> Self {
        ConcurrencyMode::FixedConcurrency(Arc::new(Semaphore::new(limit)))
    }

    pub fn priority_fixed(limit: usize) -> Self {
        ConcurrencyMode::PriorityFixed(Arc::new(PrioritySemaphore::new(limit)))
    }

    /// Enter this stage's gate, waiting if necessary. `priority` is only
    /// consulted by [`ConcurrencyMode::PriorityFixed`]. The returned permit
    /// releases the slot (if any) when dropped.
    pub async fn acquire(&self, priority: i32) -> ConcurrencyPermit {
        match self {
            ConcurrencyMode::Parallel => ConcurrencyPermit::None,
            ConcurrencyMode::FixedConcurrency(sem) => {
                sem.acquire().await;
                ConcurrencyPermit::Fixed(sem.clone())
            }
            ConcurrencyMode::PriorityFixed(sem) => {
                sem.acquire(priority).await;
                ConcurrencyPermit::Priority(sem.clone())
            }
        }
    }
}

/// RAII handle for a slot acquired via [`ConcurrencyMode::acquire`];
/// releases it back to the gate on drop.
pub enum ConcurrencyPermit {
    None,
    Fixed(Arc<Semaphore>),
    Priority(Arc<PrioritySemaphore>),
}

impl Drop for ConcurrencyPermit {
    fn drop(&mut self) {
        match self {
            ConcurrencyPermit::None => {}
            ConcurrencyPermit::Fixed(sem) => sem.release(),
            ConcurrencyPermit::Priority(sem) => sem.release(),
        }
    }
}
