//! A bounded counting semaphore with timed acquisition.
//!
//! Backs the dispatcher's "no available worker" backpressure: acquiring a
//! permit blocks up to `workerAcquireTimeout` before giving up, rather
//! than queuing jobs without bound.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub struct Semaphore {
    permits: Mutex<usize>,
    cv: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            cv: Condvar::new(),
        }
    }

    /// Blocks until a permit is available or `timeout` elapses. Returns
    /// `true` if a permit was acquired.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = self.permits.lock().unwrap();
        loop {
            if *permits > 0 {
                *permits -= 1;
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, timeout_result) = self.cv.wait_timeout(permits, deadline - now).unwrap();
            permits = guard;
            if timeout_result.timed_out() && *permits == 0 {
                return false;
            }
        }
    }

    pub fn release(&self) {
        let mut permits = self.permits.lock().unwrap();
        *permits += 1;
        self.cv.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquires_immediately_when_permits_available() {
        let sem = Semaphore::new(1);
        assert!(sem.acquire_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn times_out_when_exhausted() {
        let sem = Semaphore::new(1);
        assert!(sem.acquire_timeout(Duration::from_millis(10)));
        assert!(!sem.acquire_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn release_wakes_a_waiter() {
        let sem = Arc::new(Semaphore::new(1));
        assert!(sem.acquire_timeout(Duration::from_millis(10)));

        let sem2 = sem.clone();
        let handle = thread::spawn(move || sem2.acquire_timeout(Duration::from_secs(2)));

        thread::sleep(Duration::from_millis(20));
        sem.release();

        assert!(handle.join().unwrap());
    }
}
