//! Request path classification.
//!
//! Every request is mapped onto the working root and dispatched on its
//! final path segment. [`RequestPath`] does the mapping once so the handler
//! never touches raw URI text.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

use wasmserve_shim::SHIM_FILE_NAME;

/// Name the bootstrap page loads the artifact from.
pub const ARTIFACT_FILE_NAME: &str = "main.wasm";

/// File that overrides the bootstrap page when present.
pub const INDEX_FILE_NAME: &str = "index.html";

/// Long-poll endpoint.
pub const WAIT_SEGMENT: &str = "_wait";

/// Reload trigger endpoint.
pub const NOTIFY_SEGMENT: &str = "_notify";

/// What a request asks for, decided by its final segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// A directory or `index.html`.
    Index,
    /// `wasm_exec.js`.
    Shim,
    /// `main.wasm`.
    Artifact,
    /// `_wait`.
    Wait,
    /// `_notify`.
    Notify,
    /// Anything else.
    Static,
}

/// A decoded request path, relative to the working root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    relative: PathBuf,
    directory: bool,
}

impl RequestPath {
    /// Decode a URI path (no query).
    ///
    /// Returns `None` for paths that are not valid UTF-8 once decoded or
    /// that try to climb out of the root with `..`.
    pub fn parse(uri_path: &str) -> Option<Self> {
        let decoded = percent_decode_str(uri_path).decode_utf8().ok()?;

        let mut relative = PathBuf::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => return None,
                s if s.contains('\\') || s.contains('\0') => return None,
                s => relative.push(s),
            }
        }

        let directory = decoded.ends_with('/') || relative.as_os_str().is_empty();
        Some(Self {
            relative,
            directory,
        })
    }

    /// `true` if the URI path ends in `/` (or is the root).
    pub fn is_directory(&self) -> bool {
        self.directory
    }

    /// The final segment, or `None` for directory paths.
    pub fn file_name(&self) -> Option<&str> {
        if self.directory {
            return None;
        }
        self.relative.file_name().and_then(|n| n.to_str())
    }

    /// Dispatch target.
    pub fn kind(&self) -> RequestKind {
        match self.file_name() {
            None | Some(INDEX_FILE_NAME) => RequestKind::Index,
            Some(name) if name == SHIM_FILE_NAME => RequestKind::Shim,
            Some(ARTIFACT_FILE_NAME) => RequestKind::Artifact,
            Some(WAIT_SEGMENT) => RequestKind::Wait,
            Some(NOTIFY_SEGMENT) => RequestKind::Notify,
            Some(_) => RequestKind::Static,
        }
    }

    /// Where the path lives under `root`.
    pub fn local(&self, root: &Path) -> PathBuf {
        root.join(&self.relative)
    }

    /// The file whose presence suppresses a synthesized page.
    ///
    /// For directory paths this is the directory's `index.html`.
    pub fn index_file(&self, root: &Path) -> PathBuf {
        let local = self.local(root);
        if self.directory {
            local.join(INDEX_FILE_NAME)
        } else {
            local
        }
    }
}
