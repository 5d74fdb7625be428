//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream origin that serves the application and its API.
    ///
    /// Set via SHELLCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Address the local intermediary listens on.
    ///
    /// Set via SHELLCACHE_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to SQLite store database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Version string naming the app shell store.
    ///
    /// Changing it busts the shell store on the next activation.
    #[serde(default = "default_shell_version")]
    pub shell_version: String,

    /// Version string naming the game asset store.
    ///
    /// Changing it busts the asset store on the next activation.
    #[serde(default = "default_asset_version")]
    pub asset_version: String,

    /// Shell files precached on install. Any failure aborts install.
    #[serde(default = "default_shell_manifest")]
    pub shell_manifest: Vec<String>,

    /// Critical assets precached on install, best effort.
    #[serde(default = "default_critical_assets")]
    pub critical_assets: Vec<String>,

    /// Path fragment marking cache-first asset requests.
    #[serde(default = "default_asset_prefix")]
    pub asset_prefix: String,

    /// Path fragment marking network-first API requests.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// URLs containing any of these never enter the shell store.
    #[serde(default = "default_excluded_url_patterns")]
    pub excluded_url_patterns: Vec<String>,

    /// Document served when a static request can be answered by neither
    /// the shell store nor the network.
    #[serde(default = "default_offline_fallback")]
    pub offline_fallback: String,

    /// User-Agent string for upstream requests.
    ///
    /// Set via SHELLCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network timeout in milliseconds, applied to every fetch.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size accepted from upstream.
    ///
    /// Set via SHELLCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_origin() -> String {
    "http://127.0.0.1:5173".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_shell_version() -> String {
    "wwii-sky-ace-v4-destroyed-overlays".into()
}

fn default_asset_version() -> String {
    "wwii-assets-v2".into()
}

fn default_shell_manifest() -> Vec<String> {
    ["/", "/index.html", "/index.tsx", "/App.tsx", "/manifest.json", "/icons/icon-192.png", "/icons/icon-512.png"]
        .map(String::from)
        .to_vec()
}

fn default_critical_assets() -> Vec<String> {
    ["/api/asset/titleScreen", "/api/asset/player", "/api/asset/ocean1"]
        .map(String::from)
        .to_vec()
}

fn default_asset_prefix() -> String {
    "/api/asset/".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_excluded_url_patterns() -> Vec<String> {
    vec!["chrome-extension".into()]
}

fn default_offline_fallback() -> String {
    "/index.html".into()
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    52_428_800 // 50MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            shell_version: default_shell_version(),
            asset_version: default_asset_version(),
            shell_manifest: default_shell_manifest(),
            critical_assets: default_critical_assets(),
            asset_prefix: default_asset_prefix(),
            api_prefix: default_api_prefix(),
            excluded_url_patterns: default_excluded_url_patterns(),
            offline_fallback: default_offline_fallback(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
