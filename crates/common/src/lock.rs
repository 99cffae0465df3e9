//! Keyed async mutexes.
//!
//! Serializes work per logical key (a tenant, or a (tenant, contact) pair)
//! while leaving unrelated keys free to run concurrently. Guards must not be
//! held across process boundaries — this is in-process serialization only.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::Mutex as AsyncMutex;

/// Map of string key → shared async mutex.
///
/// Entries are created on first use and kept for the lifetime of the map; the
/// key space here (tenants and contacts) is small enough that eviction is not
/// worth the bookkeeping.
#[derive(Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the mutex for `key`. Lock the returned handle to
    /// enter the per-key critical section.
    #[must_use]
    pub fn get(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;

    #[tokio::test]
    async fn same_key_returns_same_mutex() {
        let locks = KeyedLocks::new();
        let a = locks.get("t1:+5511999");
        let b = locks.get("t1:+5511999");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &locks.get("t1:+5511000")));
    }

    #[tokio::test]
    async fn serializes_critical_sections_per_key() {
        let locks = Arc::new(KeyedLocks::new());
        let in_flight = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let lock = locks.get("same-key");
                let _guard = lock.lock().await;
                let n = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(n, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
