//! Engine configuration and its JSON storage

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identity::IdentityProviderKind;
use crate::visibility::Visibility;

/// Permission bits applied for each visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityPermissions {
    pub public: u32,
    pub readonly: u32,
    pub private: u32,
}

impl VisibilityPermissions {
    /// Mode bits to apply for `visibility`
    pub fn mode_for(&self, visibility: Visibility) -> u32 {
        match visibility {
            Visibility::Public => self.public,
            Visibility::Readonly => self.readonly,
            Visibility::Private => self.private,
        }
    }

    /// Visibility whose configured bits equal the permission bits of `mode`
    pub fn visibility_for(&self, mode: u32) -> Option<Visibility> {
        let bits = mode & 0o7777;
        [Visibility::Public, Visibility::Readonly, Visibility::Private]
            .into_iter()
            .find(|v| self.mode_for(*v) == bits)
    }
}

impl Default for VisibilityPermissions {
    fn default() -> Self {
        Self {
            public: 0o755,
            readonly: 0o744,
            private: 0o700,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `modecheck=debug`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration for building a [`PermissionEngine`](crate::PermissionEngine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cache policy for engine calls that do not pass one
    pub use_cache: bool,
    /// Whether the local stat source keeps a per-path cache
    pub stat_cache: bool,
    /// Identity providers, most preferred first
    pub identity_providers: Vec<IdentityProviderKind>,
    pub permissions: VisibilityPermissions,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            use_cache: true,
            stat_cache: true,
            identity_providers: IdentityProviderKind::default_chain(),
            permissions: VisibilityPermissions::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.identity_providers.is_empty() {
            return Err(Error::Config(
                "at least one identity provider is required".to_string(),
            ));
        }

        for visibility in [Visibility::Public, Visibility::Readonly, Visibility::Private] {
            let mode = self.permissions.mode_for(visibility);
            if mode > 0o7777 {
                return Err(Error::Config(format!(
                    "{} permissions {:o} exceed 7777",
                    visibility, mode
                )));
            }
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads and saves [`EngineConfig`] as JSON
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `path`, falling back to defaults when absent
    pub fn load<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(EngineConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(path: P, config: &EngineConfig) -> Result<()> {
        config.validate()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
