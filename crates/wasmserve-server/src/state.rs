//! Shared application state.
//!
//! This module provides [`AppState`], which holds shared resources
//! across all HTTP request handlers.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use wasmserve_common::{ServeConfig, ServeError};
use wasmserve_core::{ArtifactBuilder, GoBuilder, TargetSpec};
use wasmserve_shim::ShimResolver;

use crate::bootstrap::process_env;
use crate::reload::ReloadSignal;
use crate::request::ARTIFACT_FILE_NAME;

/// Shared state across all request handlers.
///
/// This struct is cloned for each request, so it uses `Arc` for shared data.
#[derive(Clone)]
pub struct AppState {
    /// Directory requests are mapped onto; local targets build here.
    root: Arc<PathBuf>,

    /// Where the artifact is written. Created by the first request.
    output: Arc<OnceCell<TempDir>>,

    /// `_wait` / `_notify` rendezvous.
    reload: Arc<ReloadSignal>,

    /// Produces `main.wasm`.
    builder: Arc<dyn ArtifactBuilder>,

    /// Finds `wasm_exec.js`.
    shim: Arc<ShimResolver>,

    /// Positional command-line arguments: target, then program arguments.
    args: Arc<Vec<String>>,

    /// Environment handed to the program.
    env: Arc<BTreeMap<String, String>>,
}

impl AppState {
    /// Create new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Build and shim configuration
    /// * `root` - Working root (usually the current directory)
    /// * `args` - Positional arguments; the first, if any, is the target
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for shim downloads cannot be
    /// created.
    pub fn new(config: &ServeConfig, root: impl Into<PathBuf>, args: Vec<String>) -> Result<Self, ServeError> {
        let root = root.into();
        let target = args.first().map(TargetSpec::new).unwrap_or_default();

        let builder = GoBuilder::new(target.clone(), config.build.clone(), &root);
        let shim = ShimResolver::new(target, config, &root)?;

        Ok(Self {
            root: Arc::new(root),
            output: Arc::new(OnceCell::new()),
            reload: Arc::new(ReloadSignal::new()),
            builder: Arc::new(builder),
            shim: Arc::new(shim),
            args: Arc::new(args),
            env: Arc::new(process_env()),
        })
    }

    /// Replace the artifact builder.
    pub fn with_artifact_builder(mut self, builder: Arc<dyn ArtifactBuilder>) -> Self {
        self.builder = builder;
        self
    }

    /// Replace the environment handed to the program.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Get the working root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the reload signal.
    pub fn reload(&self) -> &ReloadSignal {
        &self.reload
    }

    /// Get the artifact builder.
    pub fn builder(&self) -> &dyn ArtifactBuilder {
        self.builder.as_ref()
    }

    /// Get the shim resolver.
    pub fn shim(&self) -> &ShimResolver {
        &self.shim
    }

    /// Get the positional arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the program environment.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// The Output Directory, created on first use.
    ///
    /// Concurrent first callers wait for a single creation and all see the
    /// same directory.
    pub async fn output_dir(&self) -> Result<&Path, ServeError> {
        let dir = self
            .output
            .get_or_try_init(|| async {
                let dir = tempfile::Builder::new().prefix("wasmserve-").tempdir()?;
                debug!(path = %dir.path().display(), "Created output directory");
                Ok::<_, ServeError>(dir)
            })
            .await?;
        Ok(dir.path())
    }

    /// Where the built artifact lives.
    pub async fn artifact_path(&self) -> Result<PathBuf, ServeError> {
        Ok(self.output_dir().await?.join(ARTIFACT_FILE_NAME))
    }

    /// Forget the built artifact so the next request rebuilds it.
    pub async fn invalidate_artifact(&self) -> Result<(), ServeError> {
        let Some(dir) = self.output.get() else {
            return Ok(());
        };
        match tokio::fs::remove_file(dir.path().join(ARTIFACT_FILE_NAME)).await {
            Ok(()) => {
                debug!("Discarded cached artifact");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the Output Directory, if it was ever created.
    ///
    /// Called at shutdown. Failures are logged.
    pub fn remove_output_dir(&self) {
        if let Some(dir) = self.output.get() {
            match std::fs::remove_dir_all(dir.path()) {
                Ok(()) => debug!(path = %dir.path().display(), "Removed output directory"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %dir.path().display(), error = %e, "Failed to remove output directory"),
            }
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("root", &self.root)
            .field("output", &self.output.get().map(TempDir::path))
            .field("args", &self.args)
            .field("waiters", &self.reload.pending())
            .finish_non_exhaustive()
    }
}
