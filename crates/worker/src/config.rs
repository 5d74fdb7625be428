//! Resolved engine configuration.

use std::time::Duration;

use shellcache_core::urls::{parse_origin, resolve};
use shellcache_core::{AppConfig, Error, StoreRegistry};
use url::Url;

use crate::router::Router;

/// Everything the engine needs, with every URL resolved against the origin.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub registry: StoreRegistry,
    pub router: Router,
    pub shell_manifest: Vec<Url>,
    pub critical_assets: Vec<Url>,
    pub excluded_url_patterns: Vec<String>,
    pub offline_fallback: Url,
    pub network_timeout: Duration,
}

impl WorkerConfig {
    /// Resolve `config` against its origin.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin or any manifest entry
    /// cannot be resolved.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = parse_origin(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        let resolve_all = |entries: &[String]| -> Result<Vec<Url>, Error> {
            entries
                .iter()
                .map(|entry| resolve(&origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}"))))
                .collect()
        };

        Ok(Self {
            registry: StoreRegistry::from_config(config),
            router: Router::new(config.asset_prefix.clone(), config.api_prefix.clone()),
            shell_manifest: resolve_all(&config.shell_manifest)?,
            critical_assets: resolve_all(&config.critical_assets)?,
            excluded_url_patterns: config.excluded_url_patterns.clone(),
            offline_fallback: resolve(&origin, &config.offline_fallback)
                .map_err(|e| Error::InvalidUrl(format!("offline_fallback: {e}")))?,
            network_timeout: config.timeout(),
        })
    }

    /// Whether `url` is barred from entering the shell store.
    pub fn is_excluded(&self, url: &Url) -> bool {
        self.excluded_url_patterns.iter().any(|pattern| url.as_str().contains(pattern.as_str()))
    }
}
