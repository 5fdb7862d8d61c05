//! Configuration file structures for wasmserve.
//!
//! This module defines structures for TOML configuration files:
//! - [`ConfigFile`]: Top-level configuration file structure
//! - [`ServerConfigFile`]: HTTP server settings
//!
//! Command-line flags override whatever the file sets.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BuildConfig, ServeConfig, ShimConfig};

/// Top-level configuration file structure.
///
/// # Example
///
/// ```toml
/// [server]
/// bind_addr = ":8080"
/// allow_origin = "*"
/// shutdown_grace_ms = 10
///
/// [build]
/// tags = "example"
/// overlay = "overlay.json"
/// toolchain = "go"
///
/// [shim]
/// archive_url = "https://go.googlesource.com/go/+/refs/tags"
/// fetch_timeout_secs = 30
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfigFile,

    /// Compiler settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Runtime shim download settings.
    #[serde(default)]
    pub shim: ShimConfig,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigFileError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed as TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigFileError> {
        toml::from_str(content).map_err(|e| ConfigFileError::Parse {
            message: e.to_string(),
        })
    }

    /// The build pipeline part of the file.
    pub fn serve_config(&self) -> ServeConfig {
        ServeConfig {
            build: self.build.clone(),
            shim: self.shim.clone(),
        }
    }
}

/// HTTP server configuration from config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfigFile {
    /// Bind address (e.g., ":8080" or "127.0.0.1:8080").
    #[serde(default = "defaults::bind_addr")]
    pub bind_addr: String,

    /// Origin (or `*`) allowed to make cross-origin requests.
    #[serde(default)]
    pub allow_origin: Option<String>,

    /// How long in-flight requests may run after a shutdown signal.
    #[serde(default = "defaults::shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for ServerConfigFile {
    fn default() -> Self {
        Self {
            bind_addr: defaults::bind_addr(),
            allow_origin: None,
            shutdown_grace_ms: defaults::shutdown_grace_ms(),
        }
    }
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse config file: {message}")]
    Parse { message: String },
}

/// Default value functions for serde.
mod defaults {
    pub fn bind_addr() -> String {
        ":8080".to_string()
    }

    pub const fn shutdown_grace_ms() -> u64 {
        10
    }
}
