use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError, QueryParams};
use crate::models::{decode, AdminProfile, LoginData, VerifyData};

use super::session::{AuthStatus, SessionData};

/// Shown when login fails without a server message.
pub const LOGIN_FAILED: &str = "Login failed";

/// Shown when a password change fails without a server message.
pub const PASSWORD_CHANGE_FAILED: &str = "Password change failed";

/// Owns the admin session lifecycle on top of an [`ApiClient`].
///
/// The token slot and the in-memory session are the ones the client was
/// built with, so a 401 seen by any other service resets this one too.
#[derive(Clone)]
pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Startup check. With a stored token, move to `Verifying` and ask the
    /// backend; without one, settle on `Unauthenticated` with no network call.
    pub async fn initialize(&self) -> AuthStatus {
        if !self.token_present() {
            debug!("No stored token, starting unauthenticated");
            self.client.session().reset().await;
            return AuthStatus::Unauthenticated;
        }

        self.client.session().set_verifying().await;
        self.verify().await
    }

    /// Confirm the stored token with `GET /auth/verify`.
    ///
    /// Any failure removes the token and leaves the session
    /// `Unauthenticated`.
    pub async fn verify(&self) -> AuthStatus {
        let verified = self
            .client
            .get_data("/auth/verify", &QueryParams::new())
            .await
            .and_then(decode::<VerifyData>);

        match verified {
            Ok(data) => {
                info!(email = %data.admin.email, "Stored token verified");
                self.client.session().set_authenticated(data.admin).await;
                AuthStatus::Authenticated
            }
            Err(e) => {
                debug!(error = %e, "Token verification failed");
                self.forget_token();
                self.client.session().reset().await;
                AuthStatus::Unauthenticated
            }
        }
    }

    /// `POST /auth/login`. On success the token is stored durably and the
    /// session becomes `Authenticated`; on failure nothing changes.
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminProfile, ApiError> {
        let envelope = self
            .client
            .post_json("/auth/login", json!({ "email": email, "password": password }))
            .await
            .map_err(|e| {
                error!(error = %e, "Login failed");
                e
            })?;

        let data: LoginData = decode(envelope.into_data())?;

        self.client
            .tokens()
            .save(&data.token)
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
        self.client
            .session()
            .set_authenticated(data.admin.clone())
            .await;

        info!(email = %data.admin.email, "Login successful");
        Ok(data.admin)
    }

    /// Drop the token and the session. Never touches the network, so it
    /// always succeeds; a storage failure is only logged.
    pub async fn logout(&self) {
        self.forget_token();
        self.client.session().reset().await;
        info!("Logged out");
    }

    /// `PUT /auth/change-password`. The session is left as it was.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<Option<String>, ApiError> {
        let envelope = self
            .client
            .put_json(
                "/auth/change-password",
                json!({
                    "currentPassword": current_password,
                    "newPassword": new_password,
                }),
            )
            .await?;
        Ok(envelope.message)
    }

    pub async fn admin(&self) -> Option<AdminProfile> {
        self.client.session().admin().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.client.session().is_authenticated().await
    }

    pub async fn status(&self) -> AuthStatus {
        self.client.session().status().await
    }

    pub async fn snapshot(&self) -> SessionData {
        self.client.session().snapshot().await
    }

    /// Whether the durable slot currently holds a token.
    pub fn token_present(&self) -> bool {
        match self.client.tokens().load() {
            Ok(token) => token.is_some(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                false
            }
        }
    }

    fn forget_token(&self) {
        if let Err(e) = self.client.tokens().clear() {
            warn!(error = %e, "Failed to remove stored token");
        }
    }
}
