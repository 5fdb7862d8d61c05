//! Responses produced by the router itself.
//!
//! Passthrough files are answered by `tower-http`; everything wasmserve
//! generates (bootstrap page, downloaded shim, errors, redirects) goes
//! through [`ServeResponse`].

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Response, StatusCode, header};
use bytes::Bytes;

/// Content type of the runtime shim.
pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";

/// Content type of the artifact.
pub const WASM: &str = "application/wasm";

/// A generated HTTP response.
#[derive(Debug, Clone)]
pub struct ServeResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers as key-value pairs
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
}

impl ServeResponse {
    fn with_type(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: vec![(header::CONTENT_TYPE.to_string(), content_type.to_string())],
            body: body.into(),
        }
    }

    /// Create a plain text response.
    pub fn text(status: u16, body: &str) -> Self {
        Self::with_type(status, "text/plain; charset=utf-8", body.to_string())
    }

    /// Create an HTML response.
    pub fn html(body: String) -> Self {
        Self::with_type(200, "text/html; charset=utf-8", body)
    }

    /// Create a JavaScript response.
    pub fn javascript(body: Bytes) -> Self {
        Self::with_type(200, JAVASCRIPT, body)
    }

    /// Create an empty response with just a status code.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Create an error response.
    ///
    /// The message is sent verbatim as plain text so compiler output reaches
    /// the page unchanged.
    pub fn error(status: u16, message: &str) -> Self {
        let mut body = message.to_string();
        if !body.ends_with('\n') {
            body.push('\n');
        }
        Self::text(status, &body).with_header("x-content-type-options", "nosniff")
    }

    /// The response for paths that do not exist.
    pub fn not_found() -> Self {
        Self::error(404, "404 page not found")
    }

    /// Create a `303 See Other` redirect.
    pub fn redirect(location: &str) -> Self {
        Self::empty(303).with_header(header::LOCATION.as_str(), location)
    }

    /// Add a header to the response.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Convert to Axum response.
    pub fn into_axum_response(self) -> Response<Body> {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                response.headers_mut().append(name, value);
            }
        }

        response
    }
}

impl axum::response::IntoResponse for ServeResponse {
    fn into_response(self) -> axum::response::Response {
        self.into_axum_response()
    }
}
