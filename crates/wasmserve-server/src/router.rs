//! HTTP router configuration.
//!
//! This module provides functions to build the Axum router with all
//! necessary routes and middleware.

use axum::Router;
use axum::http::{HeaderValue, header};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use wasmserve_common::ServeError;

use crate::handler::handle_request;
use crate::state::AppState;

/// Build the application router.
///
/// Every path goes to the single fallback handler. When `allow_origin` is
/// set, every response (errors and redirects included) carries
/// `Access-Control-Allow-Origin` with that value.
///
/// # Errors
///
/// Returns an error if `allow_origin` is not a valid header value.
pub fn build_router(state: AppState, allow_origin: Option<&str>) -> Result<Router, ServeError> {
    let mut router = Router::new().fallback(handle_request).with_state(state);

    if let Some(origin) = allow_origin.filter(|o| !o.is_empty()) {
        let value = HeaderValue::from_str(origin)
            .map_err(|e| ServeError::invalid_config(format!("allow-origin {origin:?}: {e}")))?;
        router = router.layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            value,
        ));
    }

    Ok(router.layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;
    use wasmserve_common::ServeConfig;

    fn setup_router(root: &std::path::Path, allow_origin: Option<&str>) -> Router {
        let state = AppState::new(&ServeConfig::default(), root, Vec::new()).unwrap();
        build_router(state, allow_origin).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_page() {
        let root = tempfile::tempdir().unwrap();
        let app = setup_router(root.path(), None);

        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        let body = body_string(response).await;
        assert!(body.contains(r#"fetch("main.wasm")"#));
        assert!(body.contains("wasm_exec.js"));
    }

    #[tokio::test]
    async fn test_index_override() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("index.html"), "<p>custom</p>").unwrap();
        let app = setup_router(root.path(), None);

        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<p>custom</p>");

        let response = app.oneshot(get("/index.html")).await.unwrap();
        assert_eq!(body_string(response).await, "<p>custom</p>");
    }

    #[tokio::test]
    async fn test_static_file() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("style.css"), "body {}").unwrap();
        let app = setup_router(root.path(), None);

        let response = app.clone().oneshot(get("/style.css")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "body {}");

        let response = app.oneshot(get("/missing.css")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_local_shim_and_artifact_pass_through() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("wasm_exec.js"), "// mine").unwrap();
        std::fs::write(root.path().join("main.wasm"), b"\0asm").unwrap();
        let app = setup_router(root.path(), None);

        let response = app.clone().oneshot(get("/wasm_exec.js")).await.unwrap();
        assert_eq!(body_string(response).await, "// mine");

        let response = app.oneshot(get("/main.wasm")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "\0asm");
    }

    #[tokio::test]
    async fn test_directory_redirect() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("game")).unwrap();
        let app = setup_router(root.path(), None);

        let response = app.clone().oneshot(get("/game")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/game/");

        // The directory itself gets a bootstrap page.
        let response = app.oneshot(get("/game/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("main.wasm"));
    }

    #[tokio::test]
    async fn test_parent_traversal_rejected() {
        let root = tempfile::tempdir().unwrap();
        let app = setup_router(root.path(), None);

        let response = app.oneshot(get("/../secret")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notify_without_waiter() {
        let root = tempfile::tempdir().unwrap();
        let app = setup_router(root.path(), None);

        let response = app.oneshot(get("/_notify")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_header_on_every_branch() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("game")).unwrap();
        std::fs::write(root.path().join("style.css"), "body {}").unwrap();
        let app = setup_router(root.path(), Some("*"));

        for uri in ["/", "/game", "/style.css", "/missing", "/../x", "/_notify"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(
                response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
                "*",
                "uri {uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_no_cors_header_by_default() {
        let root = tempfile::tempdir().unwrap();
        let app = setup_router(root.path(), None);

        let response = app.oneshot(get("/")).await.unwrap();
        assert!(
            !response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }

    #[test]
    fn test_invalid_origin() {
        let root = tempfile::tempdir().unwrap();
        let state = AppState::new(&ServeConfig::default(), root.path(), Vec::new()).unwrap();
        let err = build_router(state, Some("bad\norigin")).unwrap_err();
        assert!(matches!(err, ServeError::InvalidConfig { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stat_error_is_500() {
        let root = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("loop", root.path().join("loop")).unwrap();

        let app = setup_router(root.path(), None);
        let response = app.oneshot(get("/loop")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.contains("symbolic links"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_path_below_file_is_500_not_build() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("file.txt"), "plain").unwrap();

        let app = setup_router(root.path(), None);
        let response = app.oneshot(get("/file.txt/main.wasm")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.contains("Not a directory"));
    }
}
