//! Configuration structures for wasmserve.
//!
//! This module defines configuration options for the build pipeline:
//! - [`ServeConfig`]: Top-level configuration containing all settings
//! - [`BuildConfig`]: Options passed through to the compiler
//! - [`ShimConfig`]: Where and how to download `wasm_exec.js`
//!
//! All of it is supplied once at startup and never mutated afterwards.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level serve configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServeConfig {
    /// Compiler settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Runtime shim download settings.
    #[serde(default)]
    pub shim: ShimConfig,
}

/// Compiler settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Build tags passed as `-tags`.
    #[serde(default)]
    pub tags: Option<String>,

    /// JSON file passed as `-overlay` to replace source files.
    #[serde(default)]
    pub overlay: Option<PathBuf>,

    /// The Go toolchain program.
    #[serde(default = "defaults::toolchain")]
    pub toolchain: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tags: None,
            overlay: None,
            toolchain: defaults::toolchain(),
        }
    }
}

impl BuildConfig {
    /// Set the build tags.
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    /// Set the source overlay file.
    pub fn with_overlay(mut self, overlay: impl Into<PathBuf>) -> Self {
        self.overlay = Some(overlay.into());
        self
    }

    /// Set the toolchain program.
    pub fn with_toolchain(mut self, toolchain: impl Into<PathBuf>) -> Self {
        self.toolchain = toolchain.into();
        self
    }
}

/// Runtime shim download settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShimConfig {
    /// Root of the source archive serving base64-encoded files by tag.
    #[serde(default = "defaults::archive_url")]
    pub archive_url: String,

    /// Timeout for a single download in seconds.
    #[serde(default = "defaults::fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            archive_url: defaults::archive_url(),
            fetch_timeout_secs: defaults::fetch_timeout_secs(),
        }
    }
}

impl ShimConfig {
    /// Get the download timeout as a `Duration`.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Default value functions for serde.
mod defaults {
    use std::path::PathBuf;

    pub fn toolchain() -> PathBuf {
        PathBuf::from("go")
    }

    pub fn archive_url() -> String {
        "https://go.googlesource.com/go/+/refs/tags".to_string()
    }

    pub const fn fetch_timeout_secs() -> u64 {
        30
    }
}
