//! Named response stores.
//!
//! A store is an unordered collection of `RequestKey -> CachedResponse`
//! pairs. Backends implement [`CacheStorage`]; callers work through the
//! [`Store`] handle returned by [`Store::open`]. Two backends exist:
//!
//! - [`MemoryStorage`]: process-local, for tests and ephemeral hosts
//! - [`SqliteStorage`]: persistent, with schema migrations

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::StatusCode;
use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::Error;
use crate::key::RequestKey;
use crate::message::{Response, strip_hop_by_hop};

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Immutable snapshot of a response at the time it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub response: Response,
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Copy `response` into a snapshot; the caller keeps its own value.
    pub fn snapshot(response: &Response) -> Self {
        let mut response = response.clone();
        strip_hop_by_hop(&mut response.headers);
        Self { response, stored_at: Utc::now() }
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Host persistent store API.
///
/// Every entry write replaces the previous entry for its key wholesale;
/// there are no partial updates.
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store if it does not exist yet.
    async fn open(&self, store: &str) -> Result<(), Error>;

    async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<CachedResponse>, Error>;

    /// Insert or overwrite the entry for `key`, creating the store on demand.
    async fn put(&self, store: &str, key: &RequestKey, entry: CachedResponse) -> Result<(), Error>;

    /// Delete a whole store. Returns whether it existed.
    async fn delete(&self, store: &str) -> Result<bool, Error>;

    /// Names of every existing store, sorted.
    async fn names(&self) -> Result<Vec<String>, Error>;

    async fn entry_count(&self, store: &str) -> Result<usize, Error>;
}

/// Handle to one opened store.
#[derive(Clone)]
pub struct Store {
    name: String,
    storage: Arc<dyn CacheStorage>,
}

impl Store {
    /// Open `name`, creating it if absent.
    pub async fn open(storage: Arc<dyn CacheStorage>, name: &str) -> Result<Self, Error> {
        storage.open(name).await?;
        Ok(Self { name: name.to_string(), storage })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        self.storage.get(&self.name, key).await
    }

    /// Store a copy of `response` under `key`.
    pub async fn put(&self, key: &RequestKey, response: &Response) -> Result<(), Error> {
        self.storage.put(&self.name, key, CachedResponse::snapshot(response)).await
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("name", &self.name).finish()
    }
}

/// Serialize headers as a JSON list of `[name, value-bytes]` pairs.
///
/// Values are kept as raw bytes; they are not guaranteed to be UTF-8.
pub(crate) fn encode_headers(headers: &HeaderMap) -> String {
    let pairs: Vec<(&str, &[u8])> = headers.iter().map(|(name, value)| (name.as_str(), value.as_bytes())).collect();
    serde_json::to_string(&pairs).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn decode_headers(json: &str) -> Result<HeaderMap, Error> {
    let pairs: Vec<(String, Vec<u8>)> =
        serde_json::from_str(json).map_err(|e| Error::Store(format!("invalid headers: {e}")))?;

    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Store(format!("invalid header name {name}: {e}")))?;
        let value =
            HeaderValue::from_bytes(&value).map_err(|e| Error::Store(format!("invalid header value: {e}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}

pub(crate) fn decode_status(code: i64) -> Result<StatusCode, Error> {
    u16::try_from(code)
        .ok()
        .and_then(|c| StatusCode::from_u16(c).ok())
        .ok_or_else(|| Error::Store(format!("invalid status code {code}")))
}
