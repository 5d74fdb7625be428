//! Stale-while-revalidate over the shell store, for the app shell and
//! everything else that is neither an asset nor an API call.

use std::sync::Arc;

use shellcache_core::http::Method;
use shellcache_core::{Error, Request, RequestKey, Response, StoreRole};
use tokio::sync::oneshot;

use super::Engine;

impl Engine {
    /// Start a revalidating fetch, then answer from the shell store if it has
    /// the key. On a miss the fetch result is returned; if that fails too the
    /// cached offline document is served instead.
    pub(crate) async fn stale_while_revalidate(self: &Arc<Self>, request: &Request) -> Result<Option<Response>, Error> {
        let fetched = self.revalidate(request.clone());
        let key = request.key();

        let lookup = match self.store(StoreRole::Shell).await {
            Ok(shell) => shell.get(&key).await,
            Err(err) => Err(err),
        };

        match lookup {
            Ok(Some(entry)) => {
                tracing::debug!(key = %key, "shell cache hit, revalidating");
                Ok(Some(entry.into_response()))
            }
            Ok(None) => {
                tracing::debug!(key = %key, "shell cache miss, waiting for network");
                let err = match fetched.await {
                    Ok(Ok(response)) => return Ok(Some(response)),
                    Ok(Err(err)) => err,
                    Err(_) => Error::Network(format!("{} revalidation dropped", request.url)),
                };
                self.offline_document(err).await
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "shell cache lookup failed");
                self.offline_document(err).await
            }
        }
    }

    /// Spawn the fetch for `request` in the background. A storable response is
    /// handed to its own write task before the result is sent back.
    fn revalidate(self: &Arc<Self>, request: Request) -> oneshot::Receiver<Result<Response, Error>> {
        let (tx, rx) = oneshot::channel();
        let engine = Arc::clone(self);

        self.background.spawn(async move {
            let result = engine.fetch(&request).await;

            if let Ok(response) = &result
                && engine.is_storable(&request, response)
            {
                let writer = Arc::clone(&engine);
                let key = request.key();
                let response = response.clone();
                engine.background.spawn(async move {
                    writer.write(StoreRole::Shell, &key, &response).await;
                });
            }

            let _ = tx.send(result);
        });

        rx
    }

    fn is_storable(&self, request: &Request, response: &Response) -> bool {
        response.is_ok() && request.method == Method::GET && !self.config.is_excluded(&request.url)
    }

    async fn offline_document(&self, err: Error) -> Result<Option<Response>, Error> {
        let key = RequestKey::get(&self.config.offline_fallback);
        let cached = match self.store(StoreRole::Shell).await {
            Ok(shell) => shell.get(&key).await,
            Err(lookup_err) => Err(lookup_err),
        };

        match cached {
            Ok(Some(entry)) => {
                tracing::info!(fallback = %key, error = %err, "serving offline document");
                Ok(Some(entry.into_response()))
            }
            Ok(None) => Err(err),
            Err(lookup_err) => {
                tracing::warn!(fallback = %key, error = %lookup_err, "offline document lookup failed");
                Err(err)
            }
        }
    }
}
