//! Integration tests for wasmserve-server.
//!
//! These tests run the server on an ephemeral port with a scripted `go`
//! program and talk to it over HTTP:
//! - Bootstrap page synthesis and escaping
//! - On-demand build, caching and invalidation of `main.wasm`
//! - Compiler diagnostics surfaced as the response body
//! - `wasm_exec.js` from GOROOT
//! - The `_wait` / `_notify` rendezvous
//! - CORS headers

#![cfg(unix)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use wasmserve_common::{BuildConfig, ServeConfig, ServeError};
use wasmserve_core::testing::{FAKE_WASM, FakeToolchain};
use wasmserve_core::{ArtifactBuilder, BuildOutput};
use wasmserve_server::{AppState, TestHandle, WasmServer};

async fn start(fake: &FakeToolchain, args: &[&str], allow_origin: Option<&str>) -> TestHandle {
    let config = ServeConfig {
        build: BuildConfig::default().with_toolchain(fake.program()),
        ..Default::default()
    };
    let args = args.iter().map(ToString::to_string).collect();
    let state = AppState::new(&config, fake.workdir(), args)
        .unwrap()
        .with_env(BTreeMap::from([("WASMSERVE_TEST".to_string(), "1".to_string())]));
    WasmServer::start_test(state, allow_origin).await.unwrap()
}

async fn get(server: &TestHandle, path: &str) -> reqwest::Response {
    reqwest::get(format!("{}{path}", server.url())).await.unwrap()
}

async fn until_waiting(server: &TestHandle, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while server.state().reload().pending() != n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("waiter should register");
}

// ============================================================================
// Test: Bootstrap Page
// ============================================================================

#[tokio::test]
async fn test_root_serves_bootstrap_page() {
    let fake = FakeToolchain::new().unwrap();
    let server = start(&fake, &[], None).await;

    let response = get(&server, "/").await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/html; charset=utf-8"
    );

    let body = response.text().await.unwrap();
    assert!(body.contains("main.wasm"));
    assert!(body.contains(r#"<script src="wasm_exec.js"></script>"#));
    assert!(body.contains(r#"go.env = {"WASMSERVE_TEST":"1"};"#));

    // The first argument is the artifact inside the output directory.
    let artifact = server.state().artifact_path().await.unwrap();
    assert!(body.contains(&format!("go.argv = [\"{}\"];", artifact.display())));

    server.shutdown().await;
}

#[tokio::test]
async fn test_bootstrap_escapes_arguments() {
    let fake = FakeToolchain::new().unwrap();
    let server = start(&fake, &[".", r#"say "hi"</script>"#, "a&b"], None).await;

    let body = get(&server, "/").await.text().await.unwrap();

    assert!(!body.contains(r#"say "hi""#));
    assert!(body.contains(r#""say \"hi\"\u003c/script\u003e""#));
    assert!(body.contains(r#""a\u0026b""#));
    assert_eq!(body.matches("</script>").count(), 2);

    server.shutdown().await;
}

#[tokio::test]
async fn test_index_html_overrides_bootstrap() {
    let fake = FakeToolchain::new().unwrap();
    std::fs::write(fake.workdir().join("index.html"), "<h1>mine</h1>").unwrap();
    let server = start(&fake, &[], None).await;

    let body = get(&server, "/").await.text().await.unwrap();
    assert_eq!(body, "<h1>mine</h1>");

    server.shutdown().await;
}

// ============================================================================
// Test: Artifact
// ============================================================================

#[tokio::test]
async fn test_artifact_built_once_then_cached() {
    let fake = FakeToolchain::new().unwrap();
    let server = start(&fake, &[], None).await;

    let response = get(&server, "/main.wasm").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/wasm");
    assert_eq!(&response.bytes().await.unwrap()[..], FAKE_WASM);
    assert_eq!(fake.build_count(), 1);

    let calls = fake.calls();
    assert_eq!(calls[0].goos, "js");
    assert_eq!(calls[0].goarch, "wasm");

    let response = get(&server, "/main.wasm").await;
    assert_eq!(response.status(), 200);
    assert_eq!(&response.bytes().await.unwrap()[..], FAKE_WASM);
    assert_eq!(fake.build_count(), 1);

    server.shutdown().await;
}

#[tokio::test]
async fn test_page_load_and_notify_invalidate_artifact() {
    let fake = FakeToolchain::new().unwrap();
    let server = start(&fake, &[], None).await;

    get(&server, "/main.wasm").await;
    assert_eq!(fake.build_count(), 1);

    get(&server, "/").await;
    get(&server, "/main.wasm").await;
    assert_eq!(fake.build_count(), 2);

    get(&server, "/_notify").await;
    get(&server, "/main.wasm").await;
    assert_eq!(fake.build_count(), 3);

    server.shutdown().await;
}

#[tokio::test]
async fn test_compiler_error_returned_verbatim() {
    let fake = FakeToolchain::new().unwrap();
    let server = start(&fake, &["./broken"], None).await;

    let response = get(&server, "/main.wasm").await;
    assert_eq!(response.status(), 500);

    let body = response.text().await.unwrap();
    assert!(body.contains("./broken/main.go:3:5: undefined: missingSymbol"));
    assert!(body.contains("exit status"));

    let artifact = server.state().artifact_path().await.unwrap();
    assert!(!artifact.exists());

    server.shutdown().await;
}

#[tokio::test]
async fn test_local_main_wasm_served_without_build() {
    let fake = FakeToolchain::new().unwrap();
    std::fs::write(fake.workdir().join("main.wasm"), b"prebuilt").unwrap();
    let server = start(&fake, &[], None).await;

    let body = get(&server, "/main.wasm").await.bytes().await.unwrap();
    assert_eq!(&body[..], b"prebuilt");
    assert_eq!(fake.build_count(), 0);

    server.shutdown().await;
}

// ============================================================================
// Test: Runtime Shim
// ============================================================================

#[tokio::test]
async fn test_shim_from_goroot() {
    let fake = FakeToolchain::new().unwrap();
    fake.install_shim("lib/wasm/wasm_exec.js", b"// shim").unwrap();
    let server = start(&fake, &[], None).await;

    let response = get(&server, "/wasm_exec.js").await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/javascript; charset=utf-8"
    );
    assert_eq!(response.text().await.unwrap(), "// shim");

    server.shutdown().await;
}

// ============================================================================
// Test: Reload Signal
// ============================================================================

#[tokio::test]
async fn test_wait_released_by_notify() {
    let fake = FakeToolchain::new().unwrap();
    let server = start(&fake, &[], None).await;

    let url = format!("{}/_wait", server.url());
    let waiter = tokio::spawn(async move { reqwest::get(url).await.unwrap().status() });
    until_waiting(&server, 1).await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());

    let response = get(&server, "/_notify").await;
    assert_eq!(response.status(), 200);

    let status = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("_wait should complete after _notify")
        .unwrap();
    assert_eq!(status, 200);

    server.shutdown().await;
}

// ============================================================================
// Test: CORS
// ============================================================================

#[tokio::test]
async fn test_allow_origin_on_every_response() {
    let fake = FakeToolchain::new().unwrap();
    let server = start(&fake, &[], Some("https://example.com")).await;

    for path in ["/", "/main.wasm", "/missing.txt", "/_notify"] {
        let response = get(&server, path).await;
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://example.com",
            "path {path}"
        );
    }

    server.shutdown().await;
}

// ============================================================================
// Test: Custom Builder
// ============================================================================

#[tokio::test]
async fn test_custom_artifact_builder() {
    let fake = FakeToolchain::new().unwrap();
    let builder = Arc::new(CountingBuilder::default());
    let state = AppState::new(&ServeConfig::default(), fake.workdir(), Vec::new())
        .unwrap()
        .with_artifact_builder(builder.clone());
    let server = WasmServer::start_test(state, None).await.unwrap();

    let body = get(&server, "/main.wasm").await.bytes().await.unwrap();
    assert_eq!(&body[..], b"custom");
    get(&server, "/main.wasm").await;

    assert_eq!(builder.builds.load(Ordering::SeqCst), 1);
    assert_eq!(fake.build_count(), 0);

    server.shutdown().await;
}

/// Writes a fixed payload and counts invocations.
#[derive(Default)]
struct CountingBuilder {
    builds: AtomicUsize,
}

#[async_trait]
impl ArtifactBuilder for CountingBuilder {
    async fn build(&self, output: &Path) -> Result<BuildOutput, ServeError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(output, b"custom").await?;
        Ok(BuildOutput {
            path: output.to_path_buf(),
            log: String::new(),
            duration: Duration::ZERO,
        })
    }
}
