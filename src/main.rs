//! wasmserve CLI entry point.
//!
//! Serves the current directory over HTTP, building the Go target to
//! WebAssembly whenever the browser asks for `main.wasm`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wasmserve_common::ConfigFile;
use wasmserve_server::{AppState, ServerConfig, WasmServer};

/// Development server for Go programs compiled to WebAssembly
#[derive(Parser, Debug)]
#[command(name = "wasmserve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// HTTP bind address to serve [default: :8080]
    #[arg(long = "http", value_name = "ADDR", env = "WASMSERVE_HTTP")]
    http: Option<String>,

    /// Build tags
    #[arg(long, value_name = "TAGS")]
    tags: Option<String>,

    /// Allow the given origin (or * for all origins) to make requests to this server
    #[arg(long, value_name = "ORIGIN")]
    allow_origin: Option<String>,

    /// Overwrite source files with a JSON file (see `go help build`)
    #[arg(long, value_name = "FILE")]
    overlay: Option<PathBuf>,

    /// Go toolchain program [default: go]
    #[arg(long = "go", value_name = "PROGRAM", env = "WASMSERVE_GO")]
    toolchain: Option<PathBuf>,

    /// TOML configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Package to build (default: .), followed by arguments for the program
    #[arg(value_name = "TARGET", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    /// Layer the command line over the configuration file.
    fn merge(self, mut file: ConfigFile) -> (ConfigFile, Vec<String>) {
        if let Some(addr) = self.http {
            file.server.bind_addr = addr;
        }
        if let Some(origin) = self.allow_origin.filter(|o| !o.is_empty()) {
            file.server.allow_origin = Some(origin);
        }
        if let Some(tags) = self.tags.filter(|t| !t.is_empty()) {
            file.build.tags = Some(tags);
        }
        if let Some(overlay) = self.overlay {
            file.build.overlay = Some(overlay);
        }
        if let Some(toolchain) = self.toolchain {
            file.build.toolchain = toolchain;
        }
        (file, self.args)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wasmserve=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let file = match &cli.config {
        Some(path) => ConfigFile::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => ConfigFile::default(),
    };
    let (file, args) = cli.merge(file);

    let root = std::env::current_dir().context("Failed to determine working directory")?;
    let server_config = ServerConfig::from(&file.server);

    info!(
        bind_addr = %server_config.bind_addr,
        target = args.first().map_or(".", String::as_str),
        root = %root.display(),
        shutdown_grace = ?server_config.shutdown_grace,
        "Configuration loaded"
    );

    let state = AppState::new(&file.serve_config(), root, args)
        .context("Failed to initialize server state")?;

    WasmServer::new(state, server_config)
        .run()
        .await
        .context("Server failed")?;

    Ok(())
}
