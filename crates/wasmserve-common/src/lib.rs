//! Common types, errors, and configuration for wasmserve.
//!
//! This crate provides shared functionality used across the wasmserve workspace:
//! - Error types using `thiserror` for type-safe error handling
//! - Configuration structures for build and shim settings
//! - The optional TOML configuration file

pub mod config;
pub mod config_file;
pub mod error;

pub use config::{BuildConfig, ServeConfig, ShimConfig};
pub use config_file::{ConfigFile, ConfigFileError, ServerConfigFile};
pub use error::ServeError;
