//! Per-key FIFO async mutual exclusion
//!
//! Every document path gets its own queue. Tasks submitted under the same key
//! run one after another in the order they started waiting; tasks under
//! different keys never wait on each other.
//!
//! Queues are created on first use and discarded as soon as the last holder
//! leaves, so the map only ever contains keys with work in flight.
//!
//! Limitation: in-process only. A second OS process writing the same file is
//! not excluded.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Mutex as AsyncMutex;
use tracing::trace;

type KeyQueue = Arc<AsyncMutex<()>>;

/// Lock manager shared by every store that touches the same files
#[derive(Debug, Default)]
pub struct LockManager {
    queues: Mutex<HashMap<PathBuf, KeyQueue>>,
}

/// Holds a reference to a key queue; releases the map entry on drop
///
/// Dropping happens on success, on error and on unwinding, so a failed task
/// never leaves its key behind.
struct QueueTicket<'a> {
    manager: &'a LockManager,
    key: &'a Path,
    queue: KeyQueue,
}

impl Drop for QueueTicket<'_> {
    fn drop(&mut self) {
        self.manager.leave(self.key, &self.queue);
    }
}

impl LockManager {
    /// Create an empty lock manager
    ///
    /// # Example
    ///
    /// ```
    /// use grimoire_core::lock::LockManager;
    /// use std::sync::Arc;
    ///
    /// let locks = Arc::new(LockManager::new());
    /// assert_eq!(locks.active_keys(), 0);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` with exclusive access to `key`
    ///
    /// Tasks under the same key execute strictly in FIFO order, each one
    /// starting only after the previous has fully settled. The task's own
    /// output (including an `Err`) is handed back untouched; it has no effect
    /// on the tasks queued behind it.
    ///
    /// # Example
    ///
    /// ```
    /// use grimoire_core::lock::LockManager;
    /// use std::path::Path;
    ///
    /// # tokio_test::block_on(async {
    /// let locks = LockManager::new();
    /// let value = locks.with_lock(Path::new("/data/users.json"), || async { 42 }).await;
    /// assert_eq!(value, 42);
    /// # });
    /// ```
    pub async fn with_lock<F, Fut, T>(&self, key: &Path, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = self.enter(key);

        let guard = ticket.queue.lock().await;
        trace!(key = %key.display(), "lock acquired");
        let output = task().await;
        drop(guard);
        trace!(key = %key.display(), "lock released");

        drop(ticket);
        output
    }

    /// Number of keys with at least one task holding or awaiting the lock
    pub fn active_keys(&self) -> usize {
        self.queues().len()
    }

    /// Whether `key` currently has a queue entry
    pub fn is_active(&self, key: &Path) -> bool {
        self.queues().contains_key(key)
    }

    fn enter<'a>(&'a self, key: &'a Path) -> QueueTicket<'a> {
        let queue = {
            let mut queues = self.queues();
            Arc::clone(queues.entry(key.to_path_buf()).or_default())
        };

        QueueTicket {
            manager: self,
            key,
            queue,
        }
    }

    fn leave(&self, key: &Path, queue: &KeyQueue) {
        let mut queues = self.queues();
        // Clones only happen under this map lock, so the count is exact here:
        // one for the map, one for us means no successor is queued.
        if Arc::strong_count(queue) == 2 {
            if let Some(current) = queues.get(key) {
                if Arc::ptr_eq(current, queue) {
                    queues.remove(key);
                }
            }
        }
    }

    fn queues(&self) -> MutexGuard<'_, HashMap<PathBuf, KeyQueue>> {
        // A poisoned map only means a panic happened while inserting or
        // removing an Arc; the map itself is still consistent.
        self.queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
