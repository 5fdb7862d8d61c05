//! The request handler.
//!
//! One fallback handler serves every path. It classifies the request by its
//! final segment and either synthesizes a response (bootstrap page, shim,
//! artifact, reload endpoints) or hands the request to a static file
//! service rooted at the working directory. A file that exists on disk
//! always wins over a synthesized one.

use std::fs::Metadata;
use std::path::Path;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::response::Response;
use tower::util::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use wasmserve_common::ServeError;

use crate::bootstrap::{BootstrapPage, program_argv};
use crate::request::{ARTIFACT_FILE_NAME, RequestKind, RequestPath};
use crate::response::{ServeResponse, WASM};
use crate::state::AppState;

/// Handle any request.
#[instrument(
    skip_all,
    fields(
        request_id = %Uuid::new_v4(),
        method = %req.method(),
        path = %req.uri().path(),
    )
)]
pub async fn handle_request(State(state): State<AppState>, req: Request) -> Response {
    match dispatch(&state, req).await {
        Ok(response) => response,
        Err(e) => error_to_response(&e).into_axum_response(),
    }
}

async fn dispatch(state: &AppState, req: Request) -> Result<Response, ServeError> {
    state.output_dir().await?;

    let Some(path) = RequestPath::parse(req.uri().path()) else {
        debug!("Rejected request path");
        return Ok(ServeResponse::not_found().into_axum_response());
    };
    let root = state.root();

    if !path.is_directory() {
        if let Some(meta) = stat(&path.local(root)).await? {
            if meta.is_dir() {
                let location = format!("{}/", req.uri().path());
                return Ok(ServeResponse::redirect(&location).into_axum_response());
            }
        }
    }

    match path.kind() {
        RequestKind::Index => {
            // A page load means the browser wants the current program.
            state.invalidate_artifact().await?;
            if stat(&path.index_file(root)).await?.is_none() {
                return bootstrap(state).await;
            }
        }
        RequestKind::Shim => {
            if stat(&path.local(root)).await?.is_none() {
                return shim(state).await;
            }
        }
        RequestKind::Artifact => {
            if stat(&path.local(root)).await?.is_none() {
                return artifact(state, req).await;
            }
        }
        RequestKind::Wait => {
            debug!("Waiting for reload notification");
            state.reload().wait().await;
            return Ok(ServeResponse::empty(200).into_axum_response());
        }
        RequestKind::Notify => {
            state.invalidate_artifact().await?;
            let woke = state.reload().notify();
            info!(woke, "Reload requested");
            return Ok(ServeResponse::empty(200).into_axum_response());
        }
        RequestKind::Static => {}
    }

    passthrough(state.root(), req).await
}

/// Metadata for `path`, or `None` if nothing is there.
async fn stat(path: &Path) -> Result<Option<Metadata>, ServeError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) => {
            let e = ServeError::from(e);
            if e.is_not_found() { Ok(None) } else { Err(e) }
        }
    }
}

async fn bootstrap(state: &AppState) -> Result<Response, ServeError> {
    let artifact = state.artifact_path().await?;
    let argv = program_argv(state.args(), &artifact);

    let html = BootstrapPage {
        artifact_url: ARTIFACT_FILE_NAME,
        argv: &argv,
        env: state.env(),
    }
    .render()
    .map_err(|e| ServeError::Io(e.into()))?;

    debug!(argc = argv.len(), "Serving bootstrap page");
    Ok(ServeResponse::html(html)
        .with_header(header::CACHE_CONTROL.as_str(), "no-cache")
        .into_axum_response())
}

async fn shim(state: &AppState) -> Result<Response, ServeError> {
    match state.shim().resolve().await {
        Ok(contents) => Ok(ServeResponse::javascript(contents).into_axum_response()),
        Err(e) => {
            error!(error = %e, "Failed to resolve wasm_exec.js");
            Err(e)
        }
    }
}

async fn artifact(state: &AppState, req: Request) -> Result<Response, ServeError> {
    let path = state.artifact_path().await?;

    if stat(&path).await?.is_none() {
        let start = Instant::now();
        match state.builder().build(&path).await {
            Ok(output) => {
                if !output.log.is_empty() {
                    debug!(log = %output.log.trim_end(), "Toolchain output");
                }
                info!(
                    duration_ms = output.duration.as_millis(),
                    path = %output.path.display(),
                    "Build completed"
                );
            }
            Err(e) => {
                warn!(
                    error = %e,
                    duration_ms = start.elapsed().as_millis(),
                    "Build failed"
                );
                return Err(e);
            }
        }
    } else {
        debug!("Serving cached artifact");
    }

    let mut response = ServeFile::new(&path)
        .oneshot(req)
        .await
        .unwrap_or_else(|never| match never {})
        .map(Body::new);
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(WASM));
    }
    Ok(response)
}

/// Serve a file from the working root as-is.
async fn passthrough(root: &Path, req: Request) -> Result<Response, ServeError> {
    let response = ServeDir::new(root)
        .oneshot(req)
        .await
        .unwrap_or_else(|never| match never {});
    Ok(response.map(Body::new))
}

/// Convert ServeError to HTTP response.
///
/// Bodies carry the error text verbatim; for build failures that is the
/// compiler output the bootstrap page shows.
pub fn error_to_response(error: &ServeError) -> ServeResponse {
    if error.is_not_found() {
        return ServeResponse::not_found();
    }
    ServeResponse::error(500, &error.to_string())
}
