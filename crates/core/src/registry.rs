//! Versioned store names.
//!
//! Each logical store is named by its own version string, so bumping one
//! version busts only that role's content on the next activation.

use std::fmt;

use crate::config::AppConfig;

/// Logical role of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreRole {
    /// App shell files: entry page, manifest, icons.
    Shell,
    /// Game assets served through the asset API.
    Assets,
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreRole::Shell => f.write_str("shell"),
            StoreRole::Assets => f.write_str("assets"),
        }
    }
}

/// Maps store roles to the names of the current deployment generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRegistry {
    shell: String,
    assets: String,
}

impl StoreRegistry {
    pub fn new(shell_version: impl Into<String>, asset_version: impl Into<String>) -> Self {
        Self { shell: shell_version.into(), assets: asset_version.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.shell_version.clone(), config.asset_version.clone())
    }

    /// Version-qualified name for `role`.
    pub fn name(&self, role: StoreRole) -> &str {
        match role {
            StoreRole::Shell => &self.shell,
            StoreRole::Assets => &self.assets,
        }
    }

    /// Names of every store belonging to the current generation.
    pub fn current(&self) -> [&str; 2] {
        [&self.shell, &self.assets]
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.current().contains(&name)
    }
}
