//! Client control for the local intermediary.

use std::sync::atomic::{AtomicBool, Ordering};

use shellcache_worker::ClientControl;

/// Tracks whether the worker has claimed the clients of this host.
#[derive(Debug, Default)]
pub struct HostControl {
    claimed: AtomicBool,
}

impl HostControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests go through the worker only after `claim`.
    pub fn is_controlling(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

impl ClientControl for HostControl {
    /// A single worker generation runs per process, so there is nobody to wait for.
    fn skip_waiting(&self) {
        tracing::info!("worker skipped waiting");
    }

    fn claim(&self) {
        self.claimed.store(true, Ordering::Release);
        tracing::info!("worker claimed clients");
    }
}
