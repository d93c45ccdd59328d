//! Per-instance serialization
//!
//! Lifecycle phases of one resource instance never overlap; distinct
//! instances run in parallel. An entry lives only while some call holds or
//! waits for it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type InstanceKey = (String, String);
type LockMap = HashMap<InstanceKey, Arc<AsyncMutex<()>>>;

fn lock_map(map: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    map.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Lazily created async mutex per `(type_name, identity)`.
#[derive(Debug, Default)]
pub struct InstanceLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// Exclusive access to one instance; releasing it prunes the idle entry.
#[derive(Debug)]
pub struct InstanceGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: InstanceKey,
    locks: Arc<Mutex<LockMap>>,
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        // Release the instance first so the map holds the last reference.
        drop(self.guard.take());
        let mut locks = lock_map(&self.locks);
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

impl InstanceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one instance.
    pub async fn acquire(&self, type_name: &str, identity: &str) -> InstanceGuard {
        let key = (type_name.to_string(), identity.to_string());
        let lock = lock_map(&self.locks)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        InstanceGuard {
            guard: Some(lock.lock_owned().await),
            key,
            locks: self.locks.clone(),
        }
    }

    /// Instances currently held or awaited.
    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_instance_serializes() {
        let locks = Arc::new(InstanceLocks::new());
        let active = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let locks = locks.clone();
                let active = active.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    let _guard = locks.acquire("iga_okta_connection_resource", "ok1").await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_instances_do_not_block() {
        let locks = InstanceLocks::new();
        let _first = locks.acquire("iga_okta_connection_resource", "ok1").await;
        let second = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire("iga_okta_connection_resource", "ok2"),
        )
        .await;
        assert!(second.is_ok());

        let same_name_other_type = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire("iga_endpoint_resource", "ok1"),
        )
        .await;
        assert!(same_name_other_type.is_ok());
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = InstanceLocks::new();
        let first = locks.acquire("iga_endpoint_resource", "ep1").await;
        let second = locks.acquire("iga_endpoint_resource", "ep2").await;
        assert_eq!(locks.len(), 2);

        drop(first);
        assert_eq!(locks.len(), 1);
        drop(second);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_a_waiter_holds_it() {
        let locks = Arc::new(InstanceLocks::new());
        let held = locks.acquire("iga_endpoint_resource", "ep1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("iga_endpoint_resource", "ep1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert_eq!(locks.len(), 1);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
