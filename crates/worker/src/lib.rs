//! Request interception engine for shellcache.
//!
//! This crate provides:
//! - Lifecycle handling: install (precache) and activate (old-store cleanup)
//! - URL-based routing to one of three caching strategies
//! - The strategies themselves: cache-first, network-first and
//!   stale-while-revalidate
//! - A tracker for background revalidation and cache writes
//!
//! Stores, network and client control are injected, so the engine runs the
//! same against a real host or against in-memory doubles.

pub mod background;
pub mod config;
pub mod lifecycle;
pub mod router;
mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use background::Background;
pub use config::WorkerConfig;
pub use lifecycle::{ActivateReport, ClientControl, InstallReport, LifecycleState, NoopControl};
pub use router::{Route, Router};
pub use worker::CacheWorker;
