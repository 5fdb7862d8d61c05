//! Locating `wasm_exec.js`.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, info, instrument};

use wasmserve_common::{ServeConfig, ServeError};
use wasmserve_core::{TargetSpec, Toolchain};

use crate::{ArchiveClient, GoVersion};

/// File name the bootstrap page loads the shim from.
pub const SHIM_FILE_NAME: &str = "wasm_exec.js";

/// Where an installation keeps the shim, newest layout first.
const GOROOT_CANDIDATES: [&str; 2] = ["lib/wasm/wasm_exec.js", "misc/wasm/wasm_exec.js"];

/// Finds the runtime shim matching the toolchain that builds the target.
///
/// The local installation is preferred. When it lacks the file, the
/// module's Go version is looked up and the file is downloaded from the
/// source archive. Downloads are kept in memory for the life of the
/// resolver, keyed by URL.
pub struct ShimResolver {
    toolchain: Toolchain,
    target: TargetSpec,
    root: PathBuf,
    archive_url: String,
    client: ArchiveClient,
    downloads: DashMap<String, Bytes>,
}

impl ShimResolver {
    /// Create a resolver.
    ///
    /// # Arguments
    ///
    /// * `target` - The build target, whose module decides the Go version
    /// * `config` - Toolchain program and archive settings
    /// * `root` - Working directory toolchain queries run in
    pub fn new(
        target: TargetSpec,
        config: &ServeConfig,
        root: impl Into<PathBuf>,
    ) -> Result<Self, ServeError> {
        Ok(Self {
            toolchain: Toolchain::new(&config.build.toolchain),
            target,
            root: root.into(),
            archive_url: config.shim.archive_url.clone(),
            client: ArchiveClient::new(config.shim.fetch_timeout())?,
            downloads: DashMap::new(),
        })
    }

    /// Return the shim's contents.
    #[instrument(skip(self), fields(target = %self.target))]
    pub async fn resolve(&self) -> Result<Bytes, ServeError> {
        let goroot = self
            .toolchain
            .goroot(&self.root)
            .await
            .map_err(|e| ServeError::resolution_failed(e.to_string()))?;

        if let Some(contents) = read_local(&goroot).await? {
            return Ok(contents);
        }

        debug!(goroot = %goroot.display(), "No wasm_exec.js in GOROOT, using archive");
        self.download().await
    }

    async fn download(&self) -> Result<Bytes, ServeError> {
        let token = self
            .toolchain
            .module_go_version(&self.root, &self.target)
            .await
            .map_err(|e| ServeError::resolution_failed(e.to_string()))?;
        let url = GoVersion::parse(&token)?.shim_url(&self.archive_url);

        if let Some(hit) = self.downloads.get(&url).map(|entry| entry.value().clone()) {
            debug!(url = %url, "Using previously downloaded wasm_exec.js");
            return Ok(hit);
        }

        let contents = self.client.fetch_base64(&url).await?;
        info!(version = %token, size = contents.len(), "Downloaded wasm_exec.js");
        self.downloads.insert(url, contents.clone());
        Ok(contents)
    }
}

impl std::fmt::Debug for ShimResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShimResolver")
            .field("target", &self.target)
            .field("archive_url", &self.archive_url)
            .field("downloads", &self.downloads.len())
            .finish_non_exhaustive()
    }
}

async fn read_local(goroot: &Path) -> Result<Option<Bytes>, ServeError> {
    for candidate in GOROOT_CANDIDATES {
        let path = goroot.join(candidate);
        match tokio::fs::read(&path).await {
            Ok(contents) => {
                debug!(path = %path.display(), "Serving wasm_exec.js from GOROOT");
                return Ok(Some(Bytes::from(contents)));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ServeError::resolution_failed(format!(
                    "{}: {e}",
                    path.display()
                )));
            }
        }
    }
    Ok(None)
}
