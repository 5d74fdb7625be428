//! Process-local store backend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{CacheStorage, CachedResponse};
use crate::Error;
use crate::key::RequestKey;

type Entries = HashMap<RequestKey, CachedResponse>;

/// In-memory store backend.
///
/// Uses a HashMap of HashMaps behind a tokio RwLock. Cloning shares the
/// underlying stores.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    stores: Arc<RwLock<HashMap<String, Entries>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, store: &str) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        stores.entry(store.to_string()).or_default();
        Ok(())
    }

    async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        let stores = self.stores.read().await;
        Ok(stores.get(store).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, store: &str, key: &RequestKey, entry: CachedResponse) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        stores.entry(store.to_string()).or_default().insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, store: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        Ok(stores.remove(store).is_some())
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        let mut names: Vec<String> = stores.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn entry_count(&self, store: &str) -> Result<usize, Error> {
        let stores = self.stores.read().await;
        Ok(stores.get(store).map_or(0, HashMap::len))
    }
}
