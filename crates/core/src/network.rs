//! The network seam every strategy fetches through.

use crate::Error;
use crate::message::{Request, Response};

/// Performs real network reads for the cache engine.
///
/// Implementations resolve with whatever response the server sent,
/// including non-2xx statuses, and reject only when no response arrived.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
