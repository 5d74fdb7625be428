//! shellcache entry point.
//!
//! Boots a local HTTP intermediary in front of the game origin. Every
//! request is answered by the cache worker once it has installed and
//! claimed its clients. Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use shellcache_client::{FetchConfig, HttpNetwork};
use shellcache_core::urls::parse_origin;
use shellcache_core::{AppConfig, Network, SqliteStorage};
use shellcache_worker::{CacheWorker, WorkerConfig};
use tracing_subscriber::EnvFilter;

mod control;
mod error;
mod proxy;

use control::HostControl;
use proxy::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        origin = %config.origin,
        listen = %config.listen_addr,
        db = %config.db_path.display(),
        "starting shellcache"
    );

    let origin = parse_origin(&config.origin).context("parsing origin")?;
    let storage = Arc::new(SqliteStorage::open(&config.db_path).await.context("opening cache database")?);
    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(FetchConfig::from_app_config(&config))?);
    let control = Arc::new(HostControl::new());

    let worker = Arc::new(
        CacheWorker::new(WorkerConfig::from_app_config(&config)?, storage, Arc::clone(&network))
            .with_control(control.clone()),
    );

    worker.on_install().await.context("install failed")?;
    worker.on_activate().await.context("activate failed")?;

    let app = proxy::router(AppState {
        worker: Arc::clone(&worker),
        control,
        network,
        origin,
        max_body_bytes: config.max_bytes,
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "listening");

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => result.context("server error")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
    }

    worker.flush().await;
    tracing::info!("background work flushed");
    Ok(())
}
