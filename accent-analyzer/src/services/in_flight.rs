//! In-flight request coalescing
//!
//! Concurrent analyses of the same URL serialize on a per-key lock. The
//! first caller does the work and fills the cache; followers wake up, re-check
//! the cache and normally return without fetching or classifying again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Registry of per-key locks; entries live only while someone holds or waits on them
#[derive(Clone, Default)]
pub struct InFlightRequests {
    locks: Arc<Mutex<LockMap>>,
}

impl InFlightRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `key`
    pub async fn acquire(&self, key: &str) -> InFlightGuard {
        let lock = {
            let mut locks = lock_map(&self.locks);
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = lock.clone().lock_owned().await;

        InFlightGuard {
            locks: self.locks.clone(),
            key: key.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    /// Number of keys with an owner or waiters
    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_map(locks: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive ownership of one key; released on drop
pub struct InFlightGuard {
    locks: Arc<Mutex<LockMap>>,
    key: String,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl InFlightGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // Release first so a waiter can proceed
        self.guard.take();

        let mut locks = lock_map(&self.locks);
        // Only the map and this guard reference the lock: no waiters remain
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}
