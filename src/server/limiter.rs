//! Bound on concurrently served connections.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Counting gate for connection threads.
///
/// With no limit every `acquire` succeeds immediately and only the live count
/// is tracked. With a limit, `acquire` blocks while the limit is reached.
#[derive(Debug)]
pub struct ConnectionLimiter {
    max: Option<usize>,
    active: Mutex<usize>,
    released: Condvar,
}

/// Held by a connection thread; frees its slot on drop.
#[derive(Debug)]
pub struct ConnectionPermit {
    limiter: Arc<ConnectionLimiter>,
}

impl ConnectionLimiter {
    pub fn new(max: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            max,
            active: Mutex::new(0),
            released: Condvar::new(),
        })
    }

    /// Configured bound, if any.
    pub fn max(&self) -> Option<usize> {
        self.max
    }

    /// Connections currently holding a permit.
    pub fn active(&self) -> usize {
        *self.lock()
    }

    /// Wait for a free slot and take it.
    pub fn acquire(self: &Arc<Self>) -> ConnectionPermit {
        let mut active = self.lock();
        if let Some(max) = self.max {
            while *active >= max {
                active = self
                    .released
                    .wait(active)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
        }
        *active += 1;
        ConnectionPermit {
            limiter: Arc::clone(self),
        }
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionPermit> {
        let mut active = self.lock();
        if matches!(self.max, Some(max) if *active >= max) {
            return None;
        }
        *active += 1;
        Some(ConnectionPermit {
            limiter: Arc::clone(self),
        })
    }

    // A panicking connection thread must not wedge the accept loop.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self) {
        let mut active = self.lock();
        *active = active.saturating_sub(1);
        self.released.notify_one();
    }
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
