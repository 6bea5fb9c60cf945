//! API client for the coaching-institute REST backend.
//!
//! `ApiClient` is the single place outbound requests are configured and
//! responses are judged. It attaches the stored bearer token to every call
//! and applies the status policy: a 401 ends the session, 403/5xx are
//! surfaced with the server's message, and nothing is retried.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::auth::{Session, TokenStore};
use crate::models::Envelope;
use crate::navigation::{is_admin_path, Navigator, ADMIN_LOGIN_PATH};

use super::request::{ApiRequest, Method, QueryParams, RawResponse, RequestBody};
use super::{ApiError, Transport};

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            transport,
            tokens,
            navigator,
            session,
        }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Token from durable storage, read fresh for each request.
    fn bearer_token(&self) -> Option<String> {
        match self.tokens.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token, sending request without it");
                None
            }
        }
    }

    /// Send a request and return the parsed response envelope.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &QueryParams,
        body: Option<RequestBody>,
    ) -> Result<Envelope<Value>, ApiError> {
        let request = ApiRequest {
            method,
            path: path.to_string(),
            query: query.clone(),
            body,
            bearer: self.bearer_token(),
        };
        let endpoint = request.endpoint();
        debug!(method = method.as_str(), endpoint = %endpoint, "Sending request");

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                Self::log_transport_failure(&endpoint, &e);
                return Err(e);
            }
        };

        let response = self.check_response(&endpoint, response).await?;
        Self::parse_envelope(&endpoint, &response.body)
    }

    /// GET and return the envelope's `data`.
    pub async fn get_data(&self, path: &str, query: &QueryParams) -> Result<Value, ApiError> {
        Ok(self.send(Method::Get, path, query, None).await?.into_data())
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<Envelope<Value>, ApiError> {
        self.send(
            Method::Post,
            path,
            &QueryParams::new(),
            Some(RequestBody::Json(body)),
        )
        .await
    }

    pub async fn put_json(&self, path: &str, body: Value) -> Result<Envelope<Value>, ApiError> {
        self.send(
            Method::Put,
            path,
            &QueryParams::new(),
            Some(RequestBody::Json(body)),
        )
        .await
    }

    pub async fn delete(&self, path: &str) -> Result<Envelope<Value>, ApiError> {
        self.send(Method::Delete, path, &QueryParams::new(), None)
            .await
    }

    /// Check if response is successful, applying the status side effects if not.
    async fn check_response(
        &self,
        endpoint: &str,
        response: RawResponse,
    ) -> Result<RawResponse, ApiError> {
        if response.is_success() {
            return Ok(response);
        }

        let err = ApiError::from_status(response.status, &response.body);
        match response.status {
            401 => self.handle_unauthorized(endpoint).await,
            403 => warn!(
                endpoint,
                reason = err.server_message().unwrap_or_default(),
                "Access denied"
            ),
            500..=599 => error!(
                endpoint,
                status = response.status,
                reason = err.server_message().unwrap_or_default(),
                "Server error"
            ),
            _ => debug!(
                endpoint,
                status = response.status,
                body = %ApiError::truncate_body(&response.body),
                "Request failed"
            ),
        }
        Err(err)
    }

    /// A 401 means the stored token is no good: forget it, end the session,
    /// and bounce admin pages to the login screen. Public pages stay put.
    async fn handle_unauthorized(&self, endpoint: &str) {
        info!(endpoint, "Unauthorized response, clearing session");
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Failed to remove stored token");
        }
        self.session.reset().await;

        let current = self.navigator.current_path();
        if is_admin_path(&current) && current != ADMIN_LOGIN_PATH {
            self.navigator.navigate(ADMIN_LOGIN_PATH);
        }
    }

    fn log_transport_failure(endpoint: &str, err: &ApiError) {
        match err {
            ApiError::Timeout => warn!(endpoint, "Request timeout"),
            ApiError::Network(detail) => {
                warn!(endpoint, detail = %detail, "Network error - please check your connection")
            }
            other => warn!(endpoint, error = %other, "Request could not be sent"),
        }
    }

    fn parse_envelope(endpoint: &str, body: &str) -> Result<Envelope<Value>, ApiError> {
        if body.trim().is_empty() {
            return Ok(Envelope::default());
        }
        serde_json::from_str(body).map_err(|e| {
            warn!(endpoint, error = %e, "Failed to parse response envelope");
            ApiError::InvalidResponse(format!(
                "{} from {}: {}",
                e,
                endpoint,
                ApiError::truncate_body(body)
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::ScriptedTransport;
    use crate::auth::MemoryTokenStore;
    use crate::models::AdminProfile;
    use crate::navigation::Router;
    use serde_json::json;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        tokens: Arc<MemoryTokenStore>,
        router: Arc<Router>,
        session: Arc<Session>,
        client: ApiClient,
    }

    fn harness(path: &str, token: Option<&str>) -> Harness {
        let transport = Arc::new(ScriptedTransport::new());
        let tokens = Arc::new(match token {
            Some(t) => MemoryTokenStore::with_token(t),
            None => MemoryTokenStore::new(),
        });
        let router = Arc::new(Router::new(path));
        let session = Arc::new(Session::new());
        let client = ApiClient::new(
            transport.clone(),
            tokens.clone(),
            router.clone(),
            session.clone(),
        );
        Harness {
            transport,
            tokens,
            router,
            session,
            client,
        }
    }

    #[tokio::test]
    async fn test_attaches_bearer_token_when_present() {
        let h = harness("/", Some("jwt-abc"));
        h.transport
            .ok_data(Method::Get, "/courses", json!({"courses": []}));

        h.client.get_data("/courses", &QueryParams::new()).await.unwrap();

        let sent = h.transport.requests();
        assert_eq!(sent[0].bearer.as_deref(), Some("jwt-abc"));
    }

    #[tokio::test]
    async fn test_no_bearer_without_token() {
        let h = harness("/", None);
        h.transport.ok_data(Method::Get, "/home", json!([]));

        h.client.get_data("/home", &QueryParams::new()).await.unwrap();

        assert_eq!(h.transport.requests()[0].bearer, None);
    }

    #[tokio::test]
    async fn test_unauthorized_in_admin_area_redirects_to_login() {
        let h = harness("/admin/courses", Some("expired"));
        h.session
            .set_authenticated(AdminProfile {
                email: "admin@example.edu".into(),
                ..Default::default()
            })
            .await;
        h.transport
            .respond(Method::Get, "/courses", 401, json!({"message": "Token expired"}));

        let err = h
            .client
            .get_data("/courses", &QueryParams::new().limit(100))
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::Unauthorized(Some("Token expired".into())));
        assert_eq!(h.tokens.load().unwrap(), None);
        assert!(!h.session.is_authenticated().await);
        assert_eq!(h.router.current_path(), ADMIN_LOGIN_PATH);
        assert_eq!(h.router.take_redirect().as_deref(), Some(ADMIN_LOGIN_PATH));
    }

    #[tokio::test]
    async fn test_unauthorized_on_public_page_does_not_navigate() {
        let h = harness("/courses", Some("stale"));
        h.session
            .set_authenticated(AdminProfile::default())
            .await;
        h.transport.respond(Method::Get, "/courses", 401, json!({}));

        let err = h
            .client
            .get_data("/courses", &QueryParams::new())
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(h.tokens.load().unwrap(), None);
        assert!(!h.session.is_authenticated().await);
        assert_eq!(h.router.current_path(), "/courses");
        assert_eq!(h.router.take_redirect(), None);
    }

    #[tokio::test]
    async fn test_unauthorized_on_login_page_does_not_navigate_again() {
        let h = harness(ADMIN_LOGIN_PATH, Some("expired"));
        h.transport
            .respond(Method::Get, "/auth/verify", 401, json!({"message": "Invalid token"}));

        let err = h
            .client
            .get_data("/auth/verify", &QueryParams::new())
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(h.tokens.load().unwrap(), None);
        assert_eq!(h.router.current_path(), ADMIN_LOGIN_PATH);
        assert_eq!(h.router.take_redirect(), None);
        assert_eq!(h.router.history(), vec![ADMIN_LOGIN_PATH.to_string()]);
    }

    #[tokio::test]
    async fn test_forbidden_keeps_session_and_surfaces_message() {
        let h = harness("/admin/contacts", Some("jwt"));
        h.transport.respond(
            Method::Delete,
            "/contact/42",
            403,
            json!({"success": false, "message": "Super admin only"}),
        );

        let err = h.client.delete("/contact/42").await.unwrap_err();

        assert_eq!(err.user_message("fallback"), "Super admin only");
        assert_eq!(h.tokens.load().unwrap().as_deref(), Some("jwt"));
        assert_eq!(h.router.take_redirect(), None);
    }

    #[tokio::test]
    async fn test_server_error_and_timeout_propagate_without_retry() {
        let h = harness("/", None);
        h.transport.respond(
            Method::Get,
            "/gallery",
            503,
            json!({"message": "Maintenance"}),
        );
        h.transport
            .fail(Method::Get, "/toppers", ApiError::Timeout);

        let err = h
            .client
            .get_data("/gallery", &QueryParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ServerError { status: 503, .. }));

        let err = h
            .client
            .get_data("/toppers", &QueryParams::new())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Timeout);

        assert_eq!(h.transport.count(Method::Get, "/gallery"), 1);
        assert_eq!(h.transport.count(Method::Get, "/toppers"), 1);
    }

    #[tokio::test]
    async fn test_non_json_success_is_invalid_response() {
        let h = harness("/", None);
        h.transport.respond(Method::Get, "/home", 200, json!("<html>"));

        // A bare JSON string is not an envelope.
        let err = h
            .client
            .get_data("/home", &QueryParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}
