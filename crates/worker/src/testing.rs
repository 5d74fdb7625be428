//! Test doubles shared by the engine's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use shellcache_core::http::StatusCode;
use shellcache_core::{
    AppConfig, CacheStorage, CachedResponse, Error, MemoryStorage, Network, Request, RequestKey, Response,
};
use tokio::sync::Semaphore;
use url::Url;

use crate::config::WorkerConfig;
use crate::lifecycle::ClientControl;
use crate::strategy::Engine;

pub(crate) const ORIGIN: &str = "http://game.test";
pub(crate) const SHELL: &str = "wwii-sky-ace-v4-destroyed-overlays";
pub(crate) const ASSETS: &str = "wwii-assets-v2";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub(crate) fn get(path: &str) -> Request {
    Request::get(url(path))
}

pub(crate) fn key(path: &str) -> RequestKey {
    RequestKey::get(&url(path))
}

pub(crate) fn ok(body: &'static str) -> Response {
    Response::new(StatusCode::OK, body)
}

pub(crate) fn config() -> WorkerConfig {
    let app = AppConfig {
        origin: ORIGIN.into(),
        shell_manifest: vec!["/".into(), "/index.html".into()],
        ..Default::default()
    };
    WorkerConfig::from_app_config(&app).unwrap()
}

#[derive(Clone)]
pub(crate) enum Reply {
    Respond(Response),
    Fail,
    Hang,
}

/// Scripted network keyed by absolute URL. Unknown URLs fail.
#[derive(Default)]
pub(crate) struct MockNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<Request>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, path: &str, response: Response) -> Self {
        self.set(path, Reply::Respond(response));
        self
    }

    pub(crate) fn ok(self, path: &str, body: &'static str) -> Self {
        self.respond(path, ok(body))
    }

    pub(crate) fn fail(self, path: &str) -> Self {
        self.set(path, Reply::Fail);
        self
    }

    pub(crate) fn hang(self, path: &str) -> Self {
        self.set(path, Reply::Hang);
        self
    }

    /// Hold every reply until the semaphore hands out a permit.
    pub(crate) fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn set(&self, path: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url(path).to_string(), reply);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        let target = url(path);
        self.calls.lock().unwrap().iter().filter(|r| r.url == target).count()
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|e| Error::Network(e.to_string()))?;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .unwrap_or(Reply::Fail);

        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail => Err(Error::Network(format!("{} unreachable", request.url))),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Memory storage that counts writes and can be told to fail.
#[derive(Default)]
pub(crate) struct CountingStorage {
    inner: MemoryStorage,
    puts: AtomicUsize,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,
    fail_delete: Mutex<Option<String>>,
}

impl CountingStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_gets(&self) {
        self.fail_gets.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_delete_of(&self, store: &str) {
        *self.fail_delete.lock().unwrap() = Some(store.to_string());
    }

    pub(crate) async fn seed(&self, store: &str, path: &str, response: Response) {
        self.inner.put(store, &key(path), CachedResponse::snapshot(&response)).await.unwrap();
    }

    pub(crate) async fn body(&self, store: &str, path: &str) -> Option<String> {
        self.inner
            .get(store, &key(path))
            .await
            .unwrap()
            .map(|entry| String::from_utf8_lossy(&entry.response.body).to_string())
    }
}

#[async_trait::async_trait]
impl CacheStorage for CountingStorage {
    async fn open(&self, store: &str) -> Result<(), Error> {
        self.inner.open(store).await
    }

    async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(Error::Store("lookup failed".into()));
        }
        self.inner.get(store, key).await
    }

    async fn put(&self, store: &str, key: &RequestKey, entry: CachedResponse) -> Result<(), Error> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::Store("disk full".into()));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(store, key, entry).await
    }

    async fn delete(&self, store: &str) -> Result<bool, Error> {
        if self.fail_delete.lock().unwrap().as_deref() == Some(store) {
            return Err(Error::Store(format!("{store} is locked")));
        }
        self.inner.delete(store).await
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.inner.names().await
    }

    async fn entry_count(&self, store: &str) -> Result<usize, Error> {
        self.inner.entry_count(store).await
    }
}

/// Client control that records which signals were sent.
#[derive(Default)]
pub(crate) struct RecordingControl {
    pub(crate) skipped_waiting: AtomicBool,
    pub(crate) claimed: AtomicBool,
}

impl ClientControl for RecordingControl {
    fn skip_waiting(&self) {
        self.skipped_waiting.store(true, Ordering::SeqCst);
    }

    fn claim(&self) {
        self.claimed.store(true, Ordering::SeqCst);
    }
}

pub(crate) fn engine(network: MockNetwork) -> (Arc<Engine>, Arc<MockNetwork>, Arc<CountingStorage>) {
    engine_with(config(), network)
}

pub(crate) fn engine_with(
    config: WorkerConfig, network: MockNetwork,
) -> (Arc<Engine>, Arc<MockNetwork>, Arc<CountingStorage>) {
    let network = Arc::new(network);
    let storage = Arc::new(CountingStorage::new());
    let engine = Engine::new(config, storage.clone(), network.clone());
    (Arc::new(engine), network, storage)
}
