//! Per-`(owner, category)` serialization
//!
//! Each key gets its own async mutex so that work on one credential never
//! waits on another. Entries nobody holds or waits for are pruned whenever
//! a new lock is handed out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockKey = (String, String);

/// Map of async mutexes keyed by `(owner, category)`.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `(owner, category)`.
    ///
    /// The returned guard releases the key when dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use umacred::credentials::KeyedLocks;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let locks = KeyedLocks::new();
    /// let _a = locks.acquire("alice", "uma_pat").await;
    /// let _b = locks.acquire("bob", "uma_pat").await;
    /// assert_eq!(locks.len(), 2);
    /// # }
    /// ```
    pub async fn acquire(&self, owner: &str, category: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((owner.to_string(), category.to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.acquire("a", "c").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire("a", "c").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire("a", "c").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b", "c")).await;
        assert!(b.is_ok());
        let same_owner_other_category =
            tokio::time::timeout(Duration::from_millis(100), locks.acquire("a", "d")).await;
        assert!(same_owner_other_category.is_ok());
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = KeyedLocks::new();
        {
            let _a = locks.acquire("a", "c").await;
            let _b = locks.acquire("b", "c").await;
            assert_eq!(locks.len(), 2);
        }
        let _c = locks.acquire("c", "c").await;
        assert_eq!(locks.len(), 1);
    }
}
