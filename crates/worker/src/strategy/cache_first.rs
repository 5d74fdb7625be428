//! Cache-first with refill on miss, for game assets.

use shellcache_core::{Error, Request, Response, StoreRole};

use super::Engine;

impl Engine {
    /// Serve from the asset store; on miss fetch, store a copy, and return.
    ///
    /// Network failures become a 503 placeholder. Non-ok responses are
    /// returned but never stored. Store lookup failures propagate.
    pub(crate) async fn cache_first(&self, request: &Request) -> Result<Option<Response>, Error> {
        let assets = self.store(StoreRole::Assets).await?;
        let key = request.key();

        if let Some(entry) = assets.get(&key).await? {
            tracing::debug!(key = %key, "asset cache hit");
            return Ok(Some(entry.into_response()));
        }

        tracing::debug!(key = %key, "asset cache miss, fetching");
        let response = match self.fetch(request).await {
            Ok(response) => response,
            Err(err) if err.is_network() => {
                tracing::error!(url = %request.url, error = %err, "failed to fetch asset");
                return Ok(Some(Response::unavailable()));
            }
            Err(err) => return Err(err),
        };

        if response.is_ok() {
            match assets.put(&key, &response).await {
                Ok(()) => tracing::debug!(key = %key, "asset cached"),
                Err(err) => tracing::warn!(key = %key, error = %err, "failed to cache asset"),
            }
        }

        Ok(Some(response))
    }
}
