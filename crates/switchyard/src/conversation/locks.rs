use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{CoreError, CoreResult};

/// Table of per-conversation exclusion locks.
///
/// Entries are weak, so a conversation's lock lives only while a request holds
/// or waits on it. Dead entries are pruned whenever a new lock is created.
/// `tokio::sync::Mutex` queues waiters first-in first-out, which keeps
/// same-conversation requests in arrival order.
#[derive(Debug, Default)]
pub struct ConversationLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

/// Held for the full read-route-execute-record cycle of one request.
#[derive(Debug)]
pub struct ConversationGuard {
    _guard: OwnedMutexGuard<()>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `conversation_id`.
    pub async fn acquire(&self, conversation_id: &str) -> CoreResult<ConversationGuard> {
        let lock = self.lock_for(conversation_id)?;
        let guard = lock.lock_owned().await;
        Ok(ConversationGuard { _guard: guard })
    }

    /// Number of conversations with a live lock (held or awaited).
    #[cfg(test)]
    pub(crate) fn active(&self) -> CoreResult<usize> {
        let mut locks = self.table()?;
        locks.retain(|_, lock| lock.strong_count() > 0);
        Ok(locks.len())
    }

    fn lock_for(&self, conversation_id: &str) -> CoreResult<Arc<AsyncMutex<()>>> {
        let mut locks = self.table()?;
        if let Some(existing) = locks.get(conversation_id).and_then(Weak::upgrade) {
            return Ok(existing);
        }

        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(conversation_id.to_string(), Arc::downgrade(&lock));
        Ok(lock)
    }

    fn table(&self) -> CoreResult<std::sync::MutexGuard<'_, HashMap<String, Weak<AsyncMutex<()>>>>> {
        self.locks
            .lock()
            .map_err(|_| CoreError::Internal("conversation lock table poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn same_conversation_is_exclusive() {
        let locks = Arc::new(ConversationLocks::new());
        let guard = locks.acquire("t1").await.expect("acquire");

        let second = timeout(Duration::from_millis(50), locks.acquire("t1")).await;
        assert!(second.is_err(), "second acquire should wait");

        drop(guard);
        timeout(Duration::from_millis(200), locks.acquire("t1"))
            .await
            .expect("acquire after release")
            .expect("lock");
    }

    #[tokio::test]
    async fn different_conversations_do_not_block() {
        let locks = ConversationLocks::new();
        let _first = locks.acquire("t1").await.expect("acquire");
        let second = timeout(Duration::from_millis(200), locks.acquire("t2")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn idle_locks_are_pruned() {
        let locks = ConversationLocks::new();
        {
            let _a = locks.acquire("a").await.expect("acquire");
            let _b = locks.acquire("b").await.expect("acquire");
            assert_eq!(locks.active().expect("active"), 2);
        }
        assert_eq!(locks.active().expect("active"), 0);
    }

    #[tokio::test]
    async fn waiters_are_served_in_arrival_order() {
        let locks = Arc::new(ConversationLocks::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = locks.acquire("t1").await.expect("acquire");

        let mut tasks = Vec::new();
        for idx in 0..5 {
            let locks = locks.clone();
            let order = order.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire("t1").await.expect("acquire");
                order.lock().expect("order").push(idx);
            }));
            // Let each waiter enqueue before spawning the next.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        drop(first);
        for task in tasks {
            task.await.expect("join");
        }
        assert_eq!(*order.lock().expect("order"), vec![0, 1, 2, 3, 4]);
    }
}
