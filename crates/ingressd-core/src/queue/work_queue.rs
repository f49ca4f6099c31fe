//! The single-consumer work queue sitting between event intake and the
//! reconciler.

use ahash::AHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::sync::Notify;

/// A queued unit of work, deduplicated by `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub key: String,
    /// Skippable entries still run when popped; the flag only affects
    /// logging/metric noise at the call site, never correctness.
    pub skippable: bool,
}

struct QueueState {
    /// Preserves FIFO order of distinct keys.
    order: Vec<String>,
    entries: AHashMap<String, WorkItem>,
}

/// A single-consumer FIFO with at most one pending entry per key.
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    shutting_down: AtomicBool,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState { order: Vec::new(), entries: AHashMap::new() }),
            notify: Notify::new(),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Enqueues `key`, merging with any pending entry for the same key.
    pub async fn enqueue(&self, key: impl Into<String>) {
        self.enqueue_inner(key.into(), false).await;
    }

    /// Same as [`WorkQueue::enqueue`] but marks the entry as skippable.
    /// A skippable entry overtaken by a newer non-skippable entry *for a
    /// different key* is retained, not dropped: skippability never causes
    /// work to be lost, it only marks the entry for quieter logging.
    pub async fn enqueue_skippable(&self, key: impl Into<String>) {
        self.enqueue_inner(key.into(), true).await;
    }

    async fn enqueue_inner(&self, key: String, skippable: bool) {
        if self.shutting_down.load(Ordering::SeqCst) {
            log::warn!("work queue is shutting down, refusing to enqueue '{}'", key);
            return;
        }

        let mut state = self.state.lock().await;
        if !state.entries.contains_key(&key) {
            state.order.push(key.clone());
        }
        state.entries.insert(key.clone(), WorkItem { key, skippable });
        drop(state);
        self.notify.notify_one();
    }

    /// Pops the oldest pending item, waiting if the queue is empty.
    /// Returns `None` once shutdown has been requested and the queue has
    /// drained.
    pub async fn pop(&self) -> Option<WorkItem> {
        loop {
            {
                let mut state = self.state.lock().await;
                if !state.order.is_empty() {
                    let key = state.order.remove(0);
                    return state.entries.remove(&key);
                }
            }

            if self.shutting_down.load(Ordering::SeqCst) {
                return None;
            }

            self.notify.notified().await;
        }
    }

    /// Marks the queue as shutting down: new `enqueue*` calls are refused,
    /// and `pop` returns `None` once drained.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_keys_collapse_to_one_entry() {
        let queue = WorkQueue::new();
        queue.enqueue("a").await;
        queue.enqueue("a").await;
        queue.enqueue("b").await;

        assert_eq!(queue.pop().await.unwrap().key, "a");
        assert_eq!(queue.pop().await.unwrap().key, "b");
    }

    #[tokio::test]
    async fn shutdown_drains_then_returns_none() {
        let queue = WorkQueue::new();
        queue.enqueue("a").await;
        queue.shutdown();

        assert_eq!(queue.pop().await.unwrap().key, "a");
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_is_refused() {
        let queue = WorkQueue::new();
        queue.shutdown();
        queue.enqueue("a").await;
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn skippable_entries_are_still_popped() {
        let queue = WorkQueue::new();
        queue.enqueue_skippable("a").await;
        let item = queue.pop().await.unwrap();
        assert!(item.skippable);
    }
}
