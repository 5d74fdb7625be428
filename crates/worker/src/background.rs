//! Tracker for work that outlives the response it was started for.
//!
//! Revalidation fetches and cache writes are spawned here instead of being
//! awaited by the request. They are best effort: a write may lose a race
//! with another write for the same key, or fail, and is then only logged.
//! Hosts call [`Background::flush`] before shutting down; dropping the
//! last handle aborts whatever is still running.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinSet;

/// Cloneable handle to a shared set of background tasks.
#[derive(Clone, Default)]
pub struct Background {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl Background {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current runtime without awaiting it.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Number of tasks spawned and not yet reaped.
    pub fn pending(&self) -> usize {
        let mut tasks = self.lock();
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    /// Wait until every tracked task has finished, including tasks that
    /// were spawned by tracked tasks while flushing.
    pub async fn flush(&self) {
        loop {
            let mut batch = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                break;
            }
            while let Some(result) = batch.join_next().await {
                if let Err(err) = result {
                    tracing::warn!(error = %err, "background task did not complete");
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Background {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Background").field("pending", &self.pending()).finish()
    }
}
