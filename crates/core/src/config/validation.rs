//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::urls::parse_origin;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - either version is empty, or both versions are equal
    /// - a prefix or the offline fallback does not start with `/`
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_origin(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;

        if self.shell_version.trim().is_empty() {
            return Err(invalid("shell_version", "must not be empty"));
        }
        if self.asset_version.trim().is_empty() {
            return Err(invalid("asset_version", "must not be empty"));
        }
        if self.shell_version == self.asset_version {
            return Err(invalid("asset_version", "must differ from shell_version"));
        }

        for (field, value) in [
            ("asset_prefix", &self.asset_prefix),
            ("api_prefix", &self.api_prefix),
            ("offline_fallback", &self.offline_fallback),
        ] {
            if !value.starts_with('/') {
                return Err(invalid(field, "must start with '/'"));
            }
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.shell_manifest.contains(&self.offline_fallback) {
            tracing::warn!(
                offline_fallback = %self.offline_fallback,
                "offline fallback is not in the shell manifest; it is only served once visited"
            );
        }

        if !self.asset_prefix.starts_with(&self.api_prefix) {
            tracing::warn!(
                asset_prefix = %self.asset_prefix,
                api_prefix = %self.api_prefix,
                "asset prefix is not nested under the API prefix"
            );
        }

        Ok(())
    }
}
