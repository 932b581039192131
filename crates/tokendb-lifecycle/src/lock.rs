//! Per-token mutual exclusion.
//!
//! Two requests for the same token would otherwise both read the same
//! current status, both pass the allow-list check and both call the
//! revocation gateway. Requests for different tokens never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slot = Arc<AsyncMutex<()>>;

/// Keyed async mutex over token IDs.
///
/// Slots are created on demand and dropped again once no guard or
/// waiter refers to them, so the map only holds tokens in flight.
#[derive(Debug, Default)]
pub struct TokenLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

impl TokenLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `token_id`.
    pub async fn lock(&self, token_id: &str) -> TokenLockGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(token_id.to_string()).or_default())
        };
        let guard = slot.lock_owned().await;

        TokenLockGuard {
            locks: self,
            token_id: token_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of tokens currently locked or waited on.
    pub fn in_flight(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn release(&self, token_id: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // The map's own reference is the last one: nobody holds or waits.
        if slots
            .get(token_id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(token_id);
        }
    }
}

/// Exclusive access to one token ID; released on drop.
#[derive(Debug)]
pub struct TokenLockGuard<'a> {
    locks: &'a TokenLocks,
    token_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TokenLockGuard<'_> {
    fn drop(&mut self) {
        // The owned guard holds a reference to the slot; drop it first.
        self.guard.take();
        self.locks.release(&self.token_id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_token_is_serialized() {
        let locks = Arc::new(TokenLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("40900062ff020000").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert_eq!(locks.in_flight(), 0);
    }

    #[tokio::test]
    async fn different_tokens_do_not_contend() {
        let locks = TokenLocks::new();
        let _a = locks.lock("token-a").await;

        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock("token-b")).await;
        assert!(b.is_ok(), "lock on another token must not wait");
        assert_eq!(locks.in_flight(), 2);
    }

    #[tokio::test]
    async fn slot_survives_while_a_waiter_exists() {
        let locks = Arc::new(TokenLocks::new());
        let first = locks.lock("token-a").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("token-a").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        drop(first);
        assert_eq!(locks.in_flight(), 1, "waiter still references the slot");

        waiter.await.unwrap();
        assert_eq!(locks.in_flight(), 0);
    }
}
