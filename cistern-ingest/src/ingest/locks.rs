//! Per-project serialization of reconciliation
//!
//! Two structure submissions for the same project must never interleave
//! their start/end-element write sequences. Submissions for different
//! projects are independent and run in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of per-project exclusive locks, created on demand.
#[derive(Clone, Default)]
pub struct ProjectLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive lock for a project, waiting behind any
    /// in-flight reconciliation for the same project.
    pub async fn acquire(&self, project_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(project_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
