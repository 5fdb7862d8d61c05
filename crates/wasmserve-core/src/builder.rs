//! WebAssembly artifact building.
//!
//! [`ArtifactBuilder`] is the seam between the router and whatever produces
//! the binary. [`GoBuilder`] drives the Go toolchain as a subprocess:
//!
//! 1. Local targets build in the working root against the `go.mod` found
//!    there.
//! 2. Remote targets build in an ephemeral workspace holding a synthetic
//!    module into which the target is fetched with `go get`.
//! 3. The compiler writes to a unique temporary name beside the requested
//!    path which is then renamed into place, so a concurrent reader never
//!    sees a half-written binary.
//!
//! The builder never logs diagnostics itself; everything the toolchain
//! printed comes back in [`BuildOutput`] or in
//! [`ServeError::BuildFailed`] and the caller decides what to do with it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, instrument};
use uuid::Uuid;

use wasmserve_common::{BuildConfig, ServeError};

use crate::{TargetSpec, Toolchain};

/// Operating system the artifact is compiled for.
pub const TARGET_OS: &str = "js";

/// Architecture the artifact is compiled for.
pub const TARGET_ARCH: &str = "wasm";

/// Module name written into the synthetic `go.mod` of an ephemeral workspace.
const WORKSPACE_MODULE: &str = "wasmserve-build";

/// What a successful build reports back.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Where the artifact was written (absolute).
    pub path: PathBuf,
    /// Everything the toolchain printed, in invocation order.
    pub log: String,
    /// Wall-clock time of the whole build, preparation steps included.
    pub duration: Duration,
}

/// Produces the WebAssembly artifact at a requested path.
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    /// Build the artifact and place it at `output`.
    ///
    /// On failure nothing is left at `output` by this call.
    async fn build(&self, output: &Path) -> Result<BuildOutput, ServeError>;
}

/// Builds the target with `go build`, with `GOOS=js` and `GOARCH=wasm`.
#[derive(Debug, Clone)]
pub struct GoBuilder {
    toolchain: Toolchain,
    target: TargetSpec,
    config: BuildConfig,
    root: PathBuf,
}

impl GoBuilder {
    /// Create a builder.
    ///
    /// # Arguments
    ///
    /// * `target` - Package to build
    /// * `config` - Tags, overlay and toolchain program
    /// * `root` - Working directory for local targets; relative output
    ///   paths are resolved against it
    pub fn new(target: TargetSpec, config: BuildConfig, root: impl Into<PathBuf>) -> Self {
        Self {
            toolchain: Toolchain::new(&config.toolchain),
            target,
            config,
            root: root.into(),
        }
    }

    /// The target this builder compiles.
    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    /// Arguments for the `go build` step.
    fn build_args(&self, output: &Path, package: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["build".into()];
        if let Some(tags) = &self.config.tags {
            args.push("-tags".into());
            args.push(tags.into());
        }
        if let Some(overlay) = &self.config.overlay {
            args.push("-overlay".into());
            args.push(self.absolute(overlay).into_os_string());
        }
        args.push("-o".into());
        args.push(output.as_os_str().to_owned());
        args.push(package.into());
        args
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Create the throwaway module a remote target is fetched into.
    async fn prepare_workspace(&self, log: &mut String) -> Result<TempDir, ServeError> {
        let workspace = tempfile::Builder::new()
            .prefix("wasmserve-build-")
            .tempdir()?;

        for args in [
            &["mod", "init", WORKSPACE_MODULE][..],
            &["get", self.target.as_str()][..],
        ] {
            let output = self.toolchain.run(workspace.path(), args).await?;
            log.push_str(&output.stdout);
            log.push_str(&output.stderr);
            if !output.success() {
                return Err(ServeError::build_failed(format!("{log}{}", output.status)));
            }
        }

        debug!(workspace = %workspace.path().display(), "Ephemeral workspace ready");
        Ok(workspace)
    }

    async fn compile(&self, dir: &Path, output: &Path, log: &mut String) -> Result<(), ServeError> {
        let staging = staging_path(output);
        let package = if self.target.is_local() {
            self.target.as_str()
        } else {
            self.target.without_version()
        };
        let args = self.build_args(&staging, package);

        let mut cmd = self.toolchain.command(dir);
        cmd.args(&args)
            .env("GOOS", TARGET_OS)
            .env("GOARCH", TARGET_ARCH);

        let out = self.toolchain.output(cmd, self.toolchain.display(&args)).await?;
        log.push_str(&out.stdout);
        log.push_str(&out.stderr);

        if !out.success() {
            remove_staging(&staging).await;
            return Err(ServeError::build_failed(out.diagnostics()));
        }

        if let Err(e) = tokio::fs::rename(&staging, output).await {
            remove_staging(&staging).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactBuilder for GoBuilder {
    #[instrument(skip(self, output), fields(target = %self.target))]
    async fn build(&self, output: &Path) -> Result<BuildOutput, ServeError> {
        let start = Instant::now();
        let output = self.absolute(output);
        let mut log = String::new();

        // Dropping the workspace removes it, whichever way this returns.
        let workspace = if self.target.is_local() {
            None
        } else {
            Some(self.prepare_workspace(&mut log).await?)
        };
        let dir = workspace.as_ref().map_or(self.root.as_path(), TempDir::path);

        self.compile(dir, &output, &mut log).await?;

        Ok(BuildOutput {
            path: output,
            log,
            duration: start.elapsed(),
        })
    }
}

/// A unique sibling of `output` for the compiler to write to.
fn staging_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map_or_else(|| "artifact".into(), |n| n.to_string_lossy().into_owned());
    output.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
}

async fn remove_staging(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "Failed to remove staging file");
        }
    }
}
