//! Install and activate steps for one deployment.

use std::collections::HashSet;

use futures::future::{join_all, try_join_all};
use shellcache_core::{CacheMode, Error, Request, RequestKey, Response, StoreRole};
use url::Url;

use crate::strategy::Engine;

/// Where a worker is in its deployment lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this generation will never activate.
    Redundant,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Signals a worker sends to whatever hosts it.
pub trait ClientControl: Send + Sync {
    /// Take over from the previous generation without waiting for its clients to close.
    fn skip_waiting(&self);

    /// Start intercepting requests from clients that are already open.
    fn claim(&self);
}

/// Control for hosts that have nothing to signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopControl;

impl ClientControl for NoopControl {
    fn skip_waiting(&self) {}

    fn claim(&self) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub shell_entries: usize,
    pub assets_precached: usize,
    pub assets_skipped: Vec<Url>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
    /// Store names that were removed, sorted.
    pub deleted: Vec<String>,
}

impl Engine {
    /// Precache the shell, then the critical assets.
    ///
    /// # Errors
    ///
    /// Returns `Error::PrecacheFailed` if any shell entry fails to fetch or
    /// answers with a non-ok status. Nothing is written to the shell store in
    /// that case. Asset failures are only logged.
    pub(crate) async fn install(&self) -> Result<InstallReport, Error> {
        let shell_entries = self.precache_shell().await?;
        let (assets_precached, assets_skipped) = self.precache_assets().await;

        Ok(InstallReport { shell_entries, assets_precached, assets_skipped })
    }

    async fn precache_shell(&self) -> Result<usize, Error> {
        let shell = self.store(StoreRole::Shell).await?;

        let mut seen = HashSet::new();
        let manifest: Vec<&Url> =
            self.config.shell_manifest.iter().filter(|url| seen.insert(RequestKey::get(url))).collect();

        let fetches = manifest.into_iter().map(|url| async move {
            let request = Request::get(url.clone()).with_cache_mode(CacheMode::Reload);
            let response = self
                .fetch(&request)
                .await
                .map_err(|err| Error::PrecacheFailed { url: url.to_string(), reason: err.to_string() })?;

            if !response.is_ok() {
                return Err(Error::PrecacheFailed {
                    url: url.to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            Ok((RequestKey::get(url), response))
        });
        let responses: Vec<(RequestKey, Response)> = try_join_all(fetches).await?;

        for (key, response) in &responses {
            shell.put(key, response).await?;
        }

        tracing::info!(store = shell.name(), entries = responses.len(), "shell precached");
        Ok(responses.len())
    }

    async fn precache_assets(&self) -> (usize, Vec<Url>) {
        let assets = match self.store(StoreRole::Assets).await {
            Ok(store) => store,
            Err(err) => {
                tracing::warn!(error = %err, "asset store unavailable, skipping asset precache");
                return (0, self.config.critical_assets.clone());
            }
        };

        let attempts = self.config.critical_assets.iter().map(|url| {
            let assets = &assets;
            async move {
                let request = Request::get(url.clone());
                let outcome = match self.fetch(&request).await {
                    Ok(response) if response.is_ok() => assets.put(&request.key(), &response).await,
                    Ok(response) => Err(Error::Network(format!("status {}", response.status))),
                    Err(err) => Err(err),
                };
                (url, outcome)
            }
        });

        let mut precached = 0;
        let mut skipped = Vec::new();
        for (url, outcome) in join_all(attempts).await {
            match outcome {
                Ok(()) => precached += 1,
                Err(err) => {
                    tracing::warn!(url = %url, error = %err, "critical asset not precached");
                    skipped.push(url.clone());
                }
            }
        }

        tracing::info!(store = assets.name(), precached, skipped = skipped.len(), "assets precached");
        (precached, skipped)
    }

    /// Delete every store that does not belong to the current generation.
    ///
    /// # Errors
    ///
    /// Fails only if the store names cannot be listed.
    pub(crate) async fn activate(&self) -> Result<ActivateReport, Error> {
        let stale: Vec<String> = self
            .storage
            .names()
            .await?
            .into_iter()
            .filter(|name| !self.config.registry.is_current(name))
            .collect();

        let deletions = stale.iter().map(|name| async move { (name, self.storage.delete(name).await) });

        let mut deleted = Vec::new();
        for (name, outcome) in join_all(deletions).await {
            match outcome {
                Ok(_) => {
                    tracing::info!(store = %name, "deleted stale store");
                    deleted.push(name.clone());
                }
                Err(err) => tracing::warn!(store = %name, error = %err, "failed to delete stale store"),
            }
        }

        deleted.sort();
        Ok(ActivateReport { deleted })
    }
}
