use thiserror::Error;

/// Failure taxonomy for every call made through [`crate::api::ApiClient`].
///
/// Variants that originate from an HTTP status carry the server-provided
/// `message` field when the body had one. `Clone` lets one failure be handed
/// to every caller that joined the same in-flight request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Unauthorized: {}", .0.as_deref().unwrap_or("token may be expired"))]
    Unauthorized(Option<String>),

    #[error("Access denied: {}", .0.as_deref().unwrap_or("forbidden"))]
    AccessDenied(Option<String>),

    #[error("Resource not found: {}", .0.as_deref().unwrap_or("no such resource"))]
    NotFound(Option<String>),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Request rejected ({status}): {}", .message.as_deref().unwrap_or("bad request"))]
    BadRequest { status: u16, message: Option<String> },

    #[error("Server error ({status}): {}", .message.as_deref().unwrap_or("internal error"))]
    ServerError { status: u16, message: Option<String> },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error - please check your connection ({0})")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull the `message` field out of a JSON error body, if there is one.
    fn extract_message(body: &str) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()?
            .get("message")?
            .as_str()
            .map(str::to_string)
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        let message = Self::extract_message(body);
        match status {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError { status, message },
            _ => ApiError::BadRequest { status, message },
        }
    }

    /// The message the backend sent with a failed status, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(message)
            | ApiError::AccessDenied(message)
            | ApiError::NotFound(message) => message.as_deref(),
            ApiError::BadRequest { message, .. } | ApiError::ServerError { message, .. } => {
                message.as_deref()
            }
            _ => None,
        }
    }

    /// Human-readable text for the UI layer.
    ///
    /// Prefers the server's message; timeouts and connectivity failures get
    /// their own wording; everything else falls back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        if let Some(message) = self.server_message() {
            return message.to_string();
        }
        match self {
            ApiError::Timeout => "Request timed out".to_string(),
            ApiError::Network(_) => "Network error - please check your connection".to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
