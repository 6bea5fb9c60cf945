//! The outbound HTTP seam.
//!
//! Production code uses [`HttpTransport`] (reqwest); tests swap in a
//! scripted implementation of [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, multipart, Client};
use tracing::debug;

use super::request::{ApiRequest, RawResponse, RequestBody};
use super::ApiError;

/// HTTP request timeout in seconds.
/// 10s matches what the site has always used; there is no retry on expiry.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request. Only failures with no HTTP response (timeout,
    /// connection refused, DNS) are errors here; every status code comes
    /// back as a `RawResponse`.
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError>;
}

/// reqwest-backed transport bound to one API base URL.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_form(form: crate::api::MultipartForm) -> Result<multipart::Form, ApiError> {
        let (fields, file) = form.into_parts();
        let mut out = multipart::Form::new();
        for (name, value) in fields {
            out = out.text(name, value);
        }
        if let Some(file) = file {
            let part = multipart::Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime)?;
            out = out.part(file.field, part);
        }
        Ok(out)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.into(), &url);

        if !request.query.is_empty() {
            builder = builder.query(request.query.pairs());
        }
        if let Some(ref token) = request.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            Some(RequestBody::Json(ref body)) => builder.json(body),
            Some(RequestBody::Form(form)) => builder.multipart(Self::build_form(form)?),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(method = request.method.as_str(), url = %url, status, "Response received");

        Ok(RawResponse { status, body })
    }
}

/// Trim whitespace and trailing slashes so paths can be appended directly.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("  https://api.example.edu/api/ "),
            "https://api.example.edu/api"
        );
        assert_eq!(
            normalize_base_url("https://api.example.edu//"),
            "https://api.example.edu"
        );
        assert_eq!(normalize_base_url("http://localhost:5000"), "http://localhost:5000");
    }

    #[test]
    fn test_http_transport_normalizes_on_construction() {
        let transport = HttpTransport::new(
            "http://localhost:5000/api/",
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
        .expect("client should build");
        assert_eq!(transport.base_url(), "http://localhost:5000/api");
    }
}
