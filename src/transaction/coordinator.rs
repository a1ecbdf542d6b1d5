use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Serializes commits across transactions sharing one backend.
///
/// Clones share the same lock. Waiting commits are served in FIFO order.
#[derive(Debug, Clone, Default)]
pub struct CommitCoordinator {
    lock: Arc<Mutex<()>>,
}

impl CommitCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the commit slot. The slot is held until the guard is dropped.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// True while some commit holds the slot.
    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
