//! Error types for wasmserve.
//!
//! [`ServeError`] covers every failure the build/serve pipeline can produce.
//! The router maps each variant onto an HTTP response; none of them are
//! retried.

use std::io;

use thiserror::Error;

/// Top-level errors for the build/serve pipeline.
#[derive(Error, Debug)]
pub enum ServeError {
    /// A toolchain version token did not look like `go<major>.<minor>[.<patch>]`.
    #[error("invalid Go version: {version}")]
    InvalidVersion {
        /// The token that failed to parse.
        version: String,
    },

    /// The compiler (or a preparation step) exited unsuccessfully.
    ///
    /// Displays the captured diagnostics verbatim so they can be shown to
    /// the developer as-is.
    #[error("{diagnostics}")]
    BuildFailed {
        /// Captured standard error followed by the exit status.
        diagnostics: String,
    },

    /// The runtime shim could not be located or downloaded.
    #[error("failed to resolve wasm_exec.js: {reason}")]
    ResolutionFailed {
        /// Description of the failure.
        reason: String,
    },

    /// A toolchain query could not be started or exited unsuccessfully.
    #[error("`{command}` failed: {reason}")]
    Toolchain {
        /// The command line that was attempted.
        command: String,
        /// Spawn error or captured standard error.
        reason: String,
    },

    /// I/O operation failed.
    #[error("{0}")]
    Io(#[from] io::Error),

    /// Invalid configuration was provided.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },
}

impl ServeError {
    /// Create a new `InvalidVersion` error.
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Create a new `BuildFailed` error.
    pub fn build_failed(diagnostics: impl Into<String>) -> Self {
        Self::BuildFailed {
            diagnostics: diagnostics.into(),
        }
    }

    /// Create a new `ResolutionFailed` error.
    pub fn resolution_failed(reason: impl Into<String>) -> Self {
        Self::ResolutionFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `Toolchain` error.
    pub fn toolchain(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Toolchain {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is an I/O error for a missing file.
    ///
    /// A missing file is the expected condition that drives a build or a
    /// shim download; every other I/O error is fatal to the request.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if e.kind() == io::ErrorKind::NotFound
        )
    }

    /// Returns `true` if the error carries compiler diagnostics.
    pub fn is_build_failure(&self) -> bool {
        matches!(self, Self::BuildFailed { .. })
    }
}
