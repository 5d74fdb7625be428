//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Request, response and cache key types
//! - Versioned store naming
//! - Store backends (in-memory and SQLite)
//! - The network seam implemented by HTTP clients
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod key;
pub mod message;
pub mod network;
pub mod registry;
pub mod store;
pub mod urls;

pub use ::http;
pub use ::url::Url;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use key::RequestKey;
pub use message::{CacheMode, Request, Response};
pub use network::Network;
pub use registry::{StoreRegistry, StoreRole};
pub use store::{CacheStorage, CachedResponse, MemoryStorage, SqliteStorage, Store};
