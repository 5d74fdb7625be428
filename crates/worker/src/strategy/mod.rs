//! Retrieval strategies and the state they share.

mod cache_first;
mod network_first;
mod stale_while_revalidate;

use std::sync::Arc;

use shellcache_core::{CacheStorage, Error, Network, Request, RequestKey, Response, Store, StoreRole};

use crate::background::Background;
use crate::config::WorkerConfig;

/// Shared state every strategy and lifecycle step runs against.
pub(crate) struct Engine {
    pub(crate) config: WorkerConfig,
    pub(crate) storage: Arc<dyn CacheStorage>,
    pub(crate) network: Arc<dyn Network>,
    pub(crate) background: Background,
}

impl Engine {
    pub(crate) fn new(config: WorkerConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self { config, storage, network, background: Background::new() }
    }

    /// Open the current-generation store for `role`.
    pub(crate) async fn store(&self, role: StoreRole) -> Result<Store, Error> {
        Store::open(Arc::clone(&self.storage), self.config.registry.name(role)).await
    }

    /// Fetch through the network, bounded by the configured timeout.
    pub(crate) async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let timeout = self.config.network_timeout;
        match tokio::time::timeout(timeout, self.network.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!("{} after {}ms", request.url, timeout.as_millis()))),
        }
    }

    /// Write a copy of `response` into the `role` store, logging instead of failing.
    pub(crate) async fn write(&self, role: StoreRole, key: &RequestKey, response: &Response) {
        let result = match self.store(role).await {
            Ok(store) => store.put(key, response).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => tracing::debug!(store = %role, key = %key, "cached"),
            Err(err) => tracing::warn!(store = %role, key = %key, error = %err, "cache write failed"),
        }
    }
}
