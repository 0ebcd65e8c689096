//! Fair async mutex built on [`Semaphore`], so release-time handoff to the
//! next waiter is atomic: the waiter resumes already holding the lock, it
//! never has to race a `try_lock` caller that showed up after it.

use std::time::Duration;

use super::Semaphore;

pub struct Mutex {
    sem: Semaphore,
}

/// Boolean result of a guarded acquisition. `true` means the lock is held
/// and must be released with [`Mutex::unlock`]; `false` means the attempt
/// (or its timeout) failed to acquire it.
impl Mutex {
    pub fn new() -> Self {
        Self { sem: Semaphore::new(1) }
    }

    pub fn try_lock(&self) -> bool {
        self.sem.try_acquire()
    }

    pub async fn lock(&self) {
        self.sem.acquire().await;
    }

    pub async fn lock_timeout(&self, timeout: Duration) -> bool {
        self.sem.acquire_timeout(Some(timeout)).await
    }

    pub fn unlock(&self) {
        self.sem.release();
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn mutual_exclusion() {
        let m = Mutex::new();
        assert!(m.try_lock());
        assert!(!m.try_lock());
        m.unlock();
        assert!(m.try_lock());
    }

    #[tokio::test]
    async fn lock_timeout_elapses() {
        let m = Mutex::new();
        assert!(m.try_lock());
        assert!(!m.lock_timeout(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn fair_handoff_preserves_order() {
        let m = Arc::new(Mutex::new());
        m.try_lock();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..3 {
            let m = m.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                m.lock().await;
                order.lock().unwrap().push(i);
                m.unlock();
            }));
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        m.unlock(); // release the initial holder's lock
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }
}
