//! REST API client module for the coaching-institute backend.
//!
//! This module provides the `ApiClient` for talking to the content
//! backend, the `Transport` seam it sends through, and the request and
//! error types shared by every service built on top of it.
//!
//! The API uses bearer token authentication; the token is issued by
//! `/auth/login` and read from a `TokenStore` on every request.

pub mod client;
pub mod error;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use client::ApiClient;
pub use error::ApiError;
pub use request::{ApiRequest, FilePart, Method, MultipartForm, QueryParams, RawResponse, RequestBody};
pub use transport::{HttpTransport, Transport, DEFAULT_TIMEOUT_SECS};
