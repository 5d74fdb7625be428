//! Network-first with a shell-store fallback, for API calls.

use shellcache_core::{Error, Request, Response, StoreRole};

use super::Engine;

impl Engine {
    /// Return whatever the network answers, without storing it. On a network
    /// error fall back to the shell store entry for the same key, or `None`.
    pub(crate) async fn network_first(&self, request: &Request) -> Result<Option<Response>, Error> {
        let err = match self.fetch(request).await {
            Ok(response) => return Ok(Some(response)),
            Err(err) if err.is_network() => err,
            Err(err) => return Err(err),
        };

        let key = request.key();
        tracing::debug!(key = %key, error = %err, "api fetch failed, trying cache");

        let shell = self.store(StoreRole::Shell).await?;
        match shell.get(&key).await? {
            Some(entry) => Ok(Some(entry.into_response())),
            None => {
                tracing::debug!(key = %key, "no cached api response");
                Ok(None)
            }
        }
    }
}
