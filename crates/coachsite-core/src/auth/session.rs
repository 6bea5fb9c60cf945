use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::AdminProfile;

/// `Unauthenticated -> Verifying -> Authenticated | Unauthenticated`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    #[default]
    Unauthenticated,
    /// A stored token exists and is being checked against the backend.
    Verifying,
    Authenticated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub admin: Option<AdminProfile>,
    pub status: AuthStatus,
}

impl SessionData {
    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated
    }
}

/// In-memory session shared by the auth service and the HTTP client.
///
/// The token itself lives in a [`TokenStore`](super::TokenStore); this only
/// tracks who is signed in and whether that has been confirmed.
#[derive(Debug, Default)]
pub struct Session {
    data: RwLock<SessionData>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> SessionData {
        self.data.read().await.clone()
    }

    pub async fn status(&self) -> AuthStatus {
        self.data.read().await.status
    }

    pub async fn admin(&self) -> Option<AdminProfile> {
        self.data.read().await.admin.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.data.read().await.is_authenticated()
    }

    pub async fn set_verifying(&self) {
        let mut data = self.data.write().await;
        data.status = AuthStatus::Verifying;
    }

    pub async fn set_authenticated(&self, admin: AdminProfile) {
        let mut data = self.data.write().await;
        debug!(email = %admin.email, "Session authenticated");
        data.admin = Some(admin);
        data.status = AuthStatus::Authenticated;
    }

    /// Drop the admin identity and return to `Unauthenticated`.
    pub async fn reset(&self) {
        let mut data = self.data.write().await;
        data.admin = None;
        data.status = AuthStatus::Unauthenticated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_transitions() {
        let session = Session::new();
        assert_eq!(session.status().await, AuthStatus::Unauthenticated);

        session.set_verifying().await;
        assert_eq!(session.status().await, AuthStatus::Verifying);
        assert!(!session.is_authenticated().await);

        session
            .set_authenticated(AdminProfile {
                email: "admin@example.edu".into(),
                ..Default::default()
            })
            .await;
        assert!(session.is_authenticated().await);
        assert_eq!(
            session.admin().await.map(|a| a.email),
            Some("admin@example.edu".to_string())
        );

        session.reset().await;
        assert_eq!(session.snapshot().await, SessionData::default());
    }
}
