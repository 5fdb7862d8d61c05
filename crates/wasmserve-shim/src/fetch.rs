//! Source archive downloads.
//!
//! The Go source archive serves raw files base64-encoded when asked with
//! `?format=TEXT`. [`ArchiveClient`] downloads such a file and decodes it.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, info, instrument};

use wasmserve_common::ServeError;

/// Upper bound on an encoded download; the real shim is well below 100KB.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// HTTP client for the source archive.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    /// HTTP client (shared, connection pooled).
    client: Client,
}

impl ArchiveClient {
    /// Create a client with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, ServeError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("wasmserve/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServeError::invalid_config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Create with a custom HTTP client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` and decode its base64 body.
    #[instrument(skip(self))]
    pub async fn fetch_base64(&self, url: &str) -> Result<Bytes, ServeError> {
        debug!("Downloading from archive");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ServeError::resolution_failed(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServeError::resolution_failed(format!("GET {url}: {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ServeError::resolution_failed(format!("GET {url}: {e}")))?;

        if body.len() > MAX_BODY_BYTES {
            return Err(ServeError::resolution_failed(format!(
                "GET {url}: body of {} bytes exceeds limit",
                body.len()
            )));
        }

        let decoded = decode_base64(&body)
            .map_err(|e| ServeError::resolution_failed(format!("GET {url}: {e}")))?;

        info!(
            encoded_size = body.len(),
            decoded_size = decoded.len(),
            "Archive download completed"
        );

        Ok(Bytes::from(decoded))
    }
}

/// Decode standard base64, ignoring line breaks and other whitespace.
pub fn decode_base64(encoded: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: Vec<u8> = encoded
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD.decode(compact)
}
