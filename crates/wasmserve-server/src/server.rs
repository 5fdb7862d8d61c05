//! HTTP server implementation.
//!
//! This module provides the main [`WasmServer`] struct for running
//! the wasmserve HTTP server.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use wasmserve_common::{ServeError, ServerConfigFile};

use crate::router::build_router;
use crate::state::AppState;

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server. `:port` means all interfaces.
    pub bind_addr: String,
    /// Origin sent in `Access-Control-Allow-Origin`, if any.
    pub allow_origin: Option<String>,
    /// How long in-flight requests may continue after a shutdown signal.
    pub shutdown_grace: Duration,
    /// Enable graceful shutdown on SIGTERM/SIGINT.
    pub graceful_shutdown: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ":8080".to_string(),
            allow_origin: None,
            shutdown_grace: Duration::from_millis(10),
            graceful_shutdown: true,
        }
    }
}

impl From<&ServerConfigFile> for ServerConfig {
    fn from(file: &ServerConfigFile) -> Self {
        Self {
            bind_addr: file.bind_addr.clone(),
            allow_origin: file.allow_origin.clone(),
            shutdown_grace: Duration::from_millis(file.shutdown_grace_ms),
            graceful_shutdown: true,
        }
    }
}

impl ServerConfig {
    /// Create a new server config with custom bind address.
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Create a new server config that allows `origin` cross-origin access.
    pub fn with_allow_origin(mut self, origin: Option<String>) -> Self {
        self.allow_origin = origin;
        self
    }

    /// Create a new server config with a custom shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// The bind address in a form the socket layer accepts.
    pub fn listen_addr(&self) -> String {
        normalize_bind_addr(&self.bind_addr)
    }
}

/// Expand the `:port` shorthand to all IPv4 interfaces.
pub fn normalize_bind_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

/// wasmserve HTTP server.
///
/// This is the main entry point for running the HTTP server.
///
/// # Example
///
/// ```ignore
/// use wasmserve_server::{AppState, ServerConfig, WasmServer};
/// use wasmserve_common::ServeConfig;
///
/// let state = AppState::new(&ServeConfig::default(), std::env::current_dir()?, vec![])?;
/// let server = WasmServer::new(state, ServerConfig::default());
///
/// // Run the server
/// server.run().await?;
/// ```
pub struct WasmServer {
    /// Application state.
    state: AppState,
    /// Server configuration.
    config: ServerConfig,
}

impl WasmServer {
    /// Create a new server instance.
    pub fn new(state: AppState, config: ServerConfig) -> Self {
        Self { state, config }
    }

    /// Get a reference to the application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server until shutdown.
    ///
    /// With graceful shutdown enabled, the first SIGINT/SIGTERM stops
    /// accepting connections and gives in-flight requests the configured
    /// grace period; connections still open after that (typically `_wait`
    /// polls) are dropped. A second signal exits the process immediately.
    /// The Output Directory is removed before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind to the address.
    pub async fn run(self) -> Result<(), ServeError> {
        let app = build_router(self.state.clone(), self.config.allow_origin.as_deref())?;

        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServeError::invalid_config(format!("Failed to bind {addr}: {e}")))?;

        let local = listener.local_addr().map_or_else(|_| addr.clone(), |a| a.to_string());
        info!(addr = %local, "Listening");

        let result = if self.config.graceful_shutdown {
            let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_signal().await;
                    let _ = signalled_tx.send(());
                })
                .into_future();

            let grace = self.config.shutdown_grace;
            let deadline = async move {
                match signalled_rx.await {
                    Ok(()) => tokio::time::sleep(grace).await,
                    Err(_) => std::future::pending().await,
                }
            };

            tokio::select! {
                result = serve => result,
                () = deadline => {
                    warn!(grace_ms = grace.as_millis(), "Grace period elapsed, dropping open connections");
                    Ok(())
                }
            }
        } else {
            axum::serve(listener, app).await
        };

        self.state.remove_output_dir();

        if let Err(e) = result {
            error!(error = %e, "Server error");
        }
        info!("Exiting");
        Ok(())
    }

    /// Start the server and return a handle for testing.
    ///
    /// The server binds to an ephemeral port (127.0.0.1:0) and
    /// returns a handle that can be used to get the actual address
    /// and shut down the server.
    pub async fn start_test(state: AppState, allow_origin: Option<&str>) -> Result<TestHandle, ServeError> {
        let app = build_router(state.clone(), allow_origin)?;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| ServeError::invalid_config(format!("Failed to bind: {e}")))?;

        let addr = listener
            .local_addr()
            .map_err(|e| ServeError::invalid_config(format!("Failed to get addr: {e}")))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        Ok(TestHandle {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }
}

/// Handle for a test server instance.
///
/// Use this to interact with and shut down a test server.
pub struct TestHandle {
    /// The address the server is bound to.
    addr: SocketAddr,
    /// Application state.
    state: AppState,
    /// Shutdown signal sender.
    shutdown_tx: Option<oneshot::Sender<()>>,
    /// Server task handle.
    handle: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

impl TestHandle {
    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the server URL.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Shut the server down, dropping connections still open after a second.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if tokio::time::timeout(Duration::from_secs(1), &mut self.handle)
            .await
            .is_err()
        {
            self.handle.abort();
        }
        self.state.remove_output_dir();
    }
}

/// Wait for the first SIGINT or SIGTERM.
///
/// After it arrives, a second one terminates the process at once.
async fn shutdown_signal() {
    wait_for_signal().await;
    info!("Shutting down server...");

    tokio::spawn(async {
        wait_for_signal().await;
        warn!("Second signal received, exiting immediately");
        std::process::exit(0);
    });
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
