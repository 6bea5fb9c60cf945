//! Composition root for coachsite.
//!
//! `App` builds every service exactly once and hands out shared handles.
//! Front ends construct one `App` at startup and pass it (or the services
//! it exposes) to whatever needs them; nothing in the core crate reaches
//! for global state.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::admin::AdminService;
use crate::api::{ApiClient, HttpTransport, Transport};
use crate::auth::{AuthService, AuthStatus, Session, TokenStore};
use crate::cache::ResourceCache;
use crate::config::Config;
use crate::data::DataService;
use crate::navigation::Router;

pub struct App {
    pub config: Config,
    pub router: Arc<Router>,
    pub session: Arc<Session>,
    pub client: Arc<ApiClient>,
    pub cache: Arc<ResourceCache>,
    pub data: DataService,
    pub auth: AuthService,
    pub admin: AdminService,
}

impl App {
    /// Wire up the production stack: reqwest transport against the
    /// configured base URL and the configured token store.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let base_url = config.normalized_api_url()?;
        let transport = HttpTransport::new(&base_url, config.request_timeout())
            .context("Failed to create HTTP client")?;
        let tokens = config.open_token_store()?;
        info!(api_url = %base_url, "Using backend");
        Ok(Self::with_parts(config, Arc::new(transport), tokens))
    }

    /// Wire up with an injected transport and token store.
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let router = Arc::new(Router::default());
        let session = Arc::new(Session::new());
        let client = Arc::new(ApiClient::new(
            transport,
            tokens,
            router.clone(),
            session.clone(),
        ));
        let cache = Arc::new(ResourceCache::new(config.cache_options()));

        Self {
            data: DataService::new(client.clone(), cache.clone()),
            auth: AuthService::new(client.clone()),
            admin: AdminService::new(client.clone(), cache.clone()),
            config,
            router,
            session,
            client,
            cache,
        }
    }

    /// Restore the admin session from a stored token, if there is one.
    pub async fn startup(&self) -> AuthStatus {
        self.auth.initialize().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::ScriptedTransport;
    use crate::api::{Method, QueryParams};
    use crate::auth::MemoryTokenStore;
    use crate::navigation::{Navigator, ADMIN_LOGIN_PATH};
    use serde_json::json;

    #[tokio::test]
    async fn test_services_share_session_and_cache() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok_data(
            Method::Get,
            "/auth/verify",
            json!({"admin": {"_id": "a1", "name": "Admin", "email": "admin@example.edu"}}),
        );
        transport.ok_data(Method::Get, "/courses", json!({"courses": []}));
        transport.respond(Method::Get, "/contact/stats", 401, json!({}));
        let tokens = Arc::new(MemoryTokenStore::with_token("jwt"));
        let app = App::with_parts(Config::default(), transport.clone(), tokens.clone());

        assert_eq!(app.startup().await, AuthStatus::Authenticated);

        app.data.fetch_courses(&QueryParams::new()).await.unwrap();
        assert!(app
            .cache
            .peek(crate::models::ResourceKind::Courses, &QueryParams::new())
            .await
            .is_some());

        app.router.visit("/admin/contacts");
        assert!(app.admin.contact_stats().await.is_err());
        assert!(!app.auth.is_authenticated().await);
        assert_eq!(tokens.load().unwrap(), None);
        assert_eq!(app.router.current_path(), ADMIN_LOGIN_PATH);
    }

    #[test]
    fn test_new_requires_api_url() {
        assert!(App::new(Config::default()).is_err());
    }
}
