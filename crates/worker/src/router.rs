//! Request classification.

use std::fmt;

use url::Url;

/// Strategy a request is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Game assets: serve from the asset store, fill it on miss.
    CacheFirst,
    /// Dynamic API calls: prefer the network, fall back to the shell store.
    NetworkFirst,
    /// Shell and static files: serve the stored copy, refresh it behind the response.
    StaleWhileRevalidate,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::CacheFirst => f.write_str("cache-first"),
            Route::NetworkFirst => f.write_str("network-first"),
            Route::StaleWhileRevalidate => f.write_str("stale-while-revalidate"),
        }
    }
}

/// Classifies requests by URL path. First match wins:
/// asset prefix, then API prefix, then everything else.
#[derive(Debug, Clone)]
pub struct Router {
    asset_prefix: String,
    api_prefix: String,
}

impl Router {
    pub fn new(asset_prefix: impl Into<String>, api_prefix: impl Into<String>) -> Self {
        Self { asset_prefix: asset_prefix.into(), api_prefix: api_prefix.into() }
    }

    pub fn classify(&self, url: &Url) -> Route {
        let path = url.path();
        if path.contains(&self.asset_prefix) {
            Route::CacheFirst
        } else if path.contains(&self.api_prefix) {
            Route::NetworkFirst
        } else {
            Route::StaleWhileRevalidate
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new("/api/asset/", "/api/")
    }
}
