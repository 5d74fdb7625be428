//! The worker a host drives: lifecycle events in, intercepted requests answered.

use std::sync::{Arc, PoisonError, RwLock};

use shellcache_core::{CacheStorage, Error, Network, Request, Response};

use crate::background::Background;
use crate::config::WorkerConfig;
use crate::lifecycle::{ActivateReport, ClientControl, InstallReport, LifecycleState, NoopControl};
use crate::router::Route;
use crate::strategy::Engine;

/// One deployment of the offline cache: lifecycle events plus request handling.
pub struct CacheWorker {
    engine: Arc<Engine>,
    control: Arc<dyn ClientControl>,
    state: RwLock<LifecycleState>,
}

impl CacheWorker {
    pub fn new(config: WorkerConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            engine: Arc::new(Engine::new(config, storage, network)),
            control: Arc::new(NoopControl),
            state: RwLock::new(LifecycleState::Parsed),
        }
    }

    pub fn with_control(mut self, control: Arc<dyn ClientControl>) -> Self {
        self.control = control;
        self
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Precache the shell and critical assets, then ask the host to skip waiting.
    ///
    /// # Errors
    ///
    /// Returns the precache error; the worker is then redundant.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        self.transition(LifecycleState::Installing);

        match self.engine.install().await {
            Ok(report) => {
                self.transition(LifecycleState::Installed);
                tracing::info!(
                    shell_entries = report.shell_entries,
                    assets_precached = report.assets_precached,
                    assets_skipped = report.assets_skipped.len(),
                    "install complete"
                );
                self.control.skip_waiting();
                Ok(report)
            }
            Err(err) => {
                self.transition(LifecycleState::Redundant);
                tracing::error!(error = %err, "install failed");
                Err(err)
            }
        }
    }

    /// Drop stale stores and claim open clients.
    ///
    /// # Errors
    ///
    /// Returns `Error::Lifecycle` if install failed, or the storage error if
    /// store names cannot be listed.
    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        if self.state() == LifecycleState::Redundant {
            return Err(Error::Lifecycle("cannot activate after a failed install".into()));
        }
        self.transition(LifecycleState::Activating);

        let report = self.engine.activate().await?;
        self.transition(LifecycleState::Activated);
        tracing::info!(deleted = ?report.deleted, "activate complete");
        self.control.claim();
        Ok(report)
    }

    /// Answer an intercepted request. `None` means no response could be
    /// produced and the caller should surface a network error.
    ///
    /// # Errors
    ///
    /// Store failures, and network failures with no cached substitute.
    pub async fn handle(&self, request: Request) -> Result<Option<Response>, Error> {
        let route = self.engine.config.router.classify(&request.url);
        tracing::debug!(method = %request.method, url = %request.url, route = %route, "handling request");

        match route {
            Route::CacheFirst => self.engine.cache_first(&request).await,
            Route::NetworkFirst => self.engine.network_first(&request).await,
            Route::StaleWhileRevalidate => self.engine.stale_while_revalidate(&request).await,
        }
    }

    pub fn background(&self) -> &Background {
        &self.engine.background
    }

    /// Wait for pending revalidations and cache writes.
    pub async fn flush(&self) {
        self.engine.background.flush().await;
    }

    fn transition(&self, next: LifecycleState) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(from = %*state, to = %next, "lifecycle");
        *state = next;
    }
}

impl std::fmt::Debug for CacheWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWorker")
            .field("state", &self.state())
            .field("registry", &self.engine.config.registry)
            .finish_non_exhaustive()
    }
}
