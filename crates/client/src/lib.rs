//! Client code for shellcache.
//!
//! This crate provides the HTTP implementation of the network seam the
//! cache engine fetches through.

pub mod fetch;

pub use fetch::{FetchConfig, HttpNetwork};
