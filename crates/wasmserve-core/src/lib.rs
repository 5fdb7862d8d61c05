//! Go toolchain invocation and artifact building for wasmserve.
//!
//! This crate turns a target specification into a WebAssembly binary:
//! - [`TargetSpec`]: The package to build (local path or remote module)
//! - [`Toolchain`]: Thin async wrapper around the `go` program
//! - [`ArtifactBuilder`]: Strategy interface for producing the artifact
//! - [`GoBuilder`]: The subprocess-backed builder
//!
//! # Build flow
//!
//! ```text
//!   local target (".", "./cmd/app")      remote target ("example.com/app@v1")
//!              │                                      │
//!              │                          ephemeral workspace (temp dir)
//!              │                          go mod init / go get <target>
//!              ▼                                      ▼
//!      GOOS=js GOARCH=wasm go build -o <unique tmp> <target without @version>
//!                                │
//!                                ▼
//!                  atomic rename onto the output path
//! ```

pub mod builder;
pub mod target;
#[cfg(all(unix, any(test, feature = "testing")))]
pub mod testing;
pub mod toolchain;

pub use builder::{ArtifactBuilder, BuildOutput, GoBuilder};
pub use target::TargetSpec;
pub use toolchain::{CommandOutput, Toolchain};
