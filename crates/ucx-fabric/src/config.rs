//! Discovery configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{DiscoveryError, DiscoveryResult};

/// Environment variable holding a colon-separated list of library paths
/// that replaces the configured candidates.
pub const LIBRARY_PATH_ENV: &str = "UCX_FABRIC_LIBRARY";

/// Default values for configuration fields.
pub mod defaults {
    /// libuct names tried in order.
    pub fn library_paths() -> Vec<String> {
        vec!["libuct.so".to_string(), "libuct.so.0".to_string()]
    }
}

/// How to locate and configure libuct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Library names or paths, tried in order until one loads.
    #[serde(default = "defaults::library_paths")]
    pub library_paths: Vec<String>,

    /// Application prefix for `uct_md_config_read` (e.g. `DAOS`). libuct
    /// reads `<prefix>_UCX_*` variables when set, `UCX_*` otherwise.
    #[serde(default)]
    pub md_config_env_prefix: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            library_paths: defaults::library_paths(),
            md_config_env_prefix: None,
        }
    }
}

impl DiscoveryConfig {
    /// Loads a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> DiscoveryResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DiscoveryError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_yaml::from_str(&text).map_err(|source| DiscoveryError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        debug!(path = %path.display(), "loaded discovery config");
        Ok(config)
    }

    /// Replaces the library candidates with `UCX_FABRIC_LIBRARY` if set.
    pub fn with_env_overrides(self) -> Self {
        self.with_library_override(std::env::var(LIBRARY_PATH_ENV).ok().as_deref())
    }

    fn with_library_override(mut self, value: Option<&str>) -> Self {
        if let Some(value) = value {
            let paths: Vec<String> = value
                .split(':')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if !paths.is_empty() {
                debug!(?paths, "library candidates overridden from {}", LIBRARY_PATH_ENV);
                self.library_paths = paths;
            }
        }
        self
    }

    /// Checks the configuration for values discovery cannot use.
    pub fn validate(&self) -> DiscoveryResult<()> {
        if self.library_paths.is_empty() {
            return Err(DiscoveryError::invalid_config(
                "library_paths",
                "at least one library is required",
            ));
        }
        if self.library_paths.iter().any(|p| p.trim().is_empty()) {
            return Err(DiscoveryError::invalid_config(
                "library_paths",
                "library names must not be empty",
            ));
        }
        if let Some(prefix) = &self.md_config_env_prefix {
            if prefix.contains('\0') {
                return Err(DiscoveryError::invalid_config(
                    "md_config_env_prefix",
                    "must not contain NUL bytes",
                ));
            }
        }
        Ok(())
    }
}
