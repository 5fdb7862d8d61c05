//! Runtime shim resolution for wasmserve.
//!
//! A Go program compiled for `js/wasm` needs `wasm_exec.js` to bridge its
//! host calls to browser APIs. This crate finds that file:
//!
//! - [`version`]: Go version tokens and where the archive keeps the shim
//! - [`fetch`]: Downloads base64-encoded files from the source archive
//! - [`resolver`]: Local GOROOT first, then the archive
//!
//! Toolchains that were downloaded automatically (via a `toolchain` line in
//! `go.mod`) can lack the file, which is why the archive fallback exists.

pub mod fetch;
pub mod resolver;
pub mod version;

pub use fetch::ArchiveClient;
pub use resolver::{SHIM_FILE_NAME, ShimResolver};
pub use version::{GoVersion, wasm_exec_js_url, wasm_exec_js_url_with_base};
