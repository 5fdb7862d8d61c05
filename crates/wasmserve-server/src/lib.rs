//! HTTP Server for wasmserve.
//!
//! This crate provides the HTTP interface of the development server. It
//! handles:
//!
//! - Request classification and static file passthrough
//! - The synthesized bootstrap page
//! - On-demand builds of `main.wasm` and resolution of `wasm_exec.js`
//! - The `_wait` / `_notify` reload rendezvous
//!
//! # Quick Start
//!
//! ```ignore
//! use wasmserve_server::{AppState, ServerConfig, WasmServer};
//! use wasmserve_common::ServeConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let root = std::env::current_dir()?;
//!     let state = AppState::new(&ServeConfig::default(), root, vec![".".into()])?;
//!
//!     WasmServer::new(state, ServerConfig::default()).run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod handler;
pub mod reload;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod state;

pub use reload::ReloadSignal;
pub use server::{ServerConfig, TestHandle, WasmServer};
pub use state::AppState;
