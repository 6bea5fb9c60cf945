//! Public content access with shared loading and error state.
//!
//! `DataService` is what page-level code talks to: one accessor per
//! content category, all routed through the [`ResourceCache`], plus the
//! contact form submission which always goes to the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::api::{ApiClient, ApiError, QueryParams};
use crate::cache::{CacheAges, ResourceCache};
use crate::models::{
    decode, AchievementList, ContactSubmission, CourseList, GalleryList, HomeSection,
    ResourceKind, TopperList,
};

/// Shown when a fetch fails without a server message.
pub const FETCH_FAILED: &str = "An error occurred";

/// Shown when the contact form fails without a server message.
pub const CONTACT_SUBMIT_FAILED: &str = "Failed to submit contact form";

/// Keeps the loading counter raised for as long as it lives, including
/// when the owning future is dropped mid-request.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct DataService {
    client: Arc<ApiClient>,
    cache: Arc<ResourceCache>,
    pending: AtomicUsize,
    last_error: Mutex<Option<String>>,
}

impl DataService {
    pub fn new(client: Arc<ApiClient>, cache: Arc<ResourceCache>) -> Self {
        Self {
            client,
            cache,
            pending: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        }
    }

    /// True while any accessor or submission is awaiting a result.
    pub fn is_loading(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Message of the most recent failure. A later success does not clear it.
    pub fn last_error(&self) -> Option<String> {
        self.with_error(|slot| slot.clone())
    }

    pub fn clear_error(&self) {
        self.with_error(|slot| *slot = None);
    }

    fn with_error<R>(&self, f: impl FnOnce(&mut Option<String>) -> R) -> R {
        let mut guard = self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn record_error(&self, err: &ApiError, fallback: &str) {
        let message = err.user_message(fallback);
        self.with_error(|slot| *slot = Some(message));
    }

    async fn fetch(&self, kind: ResourceKind, params: &QueryParams) -> Result<Value, ApiError> {
        let _loading = LoadingGuard::start(&self.pending);
        let client = Arc::clone(&self.client);
        let query = params.clone();

        let result = self
            .cache
            .fetch_with_cache(kind, params, move || async move {
                client.get_data(kind.endpoint(), &query).await
            })
            .await;

        if let Err(e) = &result {
            error!(category = kind.cache_key(), error = %e, "Fetch failed");
            self.record_error(e, FETCH_FAILED);
        }
        result
    }

    async fn fetch_typed<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        params: &QueryParams,
    ) -> Result<T, ApiError> {
        let value = self.fetch(kind, params).await?;
        decode(value).map_err(|e| {
            debug!(category = kind.cache_key(), error = %e, "Payload did not match model");
            self.record_error(&e, FETCH_FAILED);
            e
        })
    }

    pub async fn fetch_courses(&self, params: &QueryParams) -> Result<Value, ApiError> {
        self.fetch(ResourceKind::Courses, params).await
    }

    pub async fn fetch_toppers(&self, params: &QueryParams) -> Result<Value, ApiError> {
        self.fetch(ResourceKind::Toppers, params).await
    }

    pub async fn fetch_achievements(&self, params: &QueryParams) -> Result<Value, ApiError> {
        self.fetch(ResourceKind::Achievements, params).await
    }

    pub async fn fetch_gallery(&self, params: &QueryParams) -> Result<Value, ApiError> {
        self.fetch(ResourceKind::Gallery, params).await
    }

    /// Home sections take no parameters.
    pub async fn fetch_home_sections(&self) -> Result<Value, ApiError> {
        self.fetch(ResourceKind::Home, &QueryParams::new()).await
    }

    pub async fn courses(&self, params: &QueryParams) -> Result<CourseList, ApiError> {
        self.fetch_typed(ResourceKind::Courses, params).await
    }

    pub async fn toppers(&self, params: &QueryParams) -> Result<TopperList, ApiError> {
        self.fetch_typed(ResourceKind::Toppers, params).await
    }

    pub async fn achievements(&self, params: &QueryParams) -> Result<AchievementList, ApiError> {
        self.fetch_typed(ResourceKind::Achievements, params).await
    }

    pub async fn gallery(&self, params: &QueryParams) -> Result<GalleryList, ApiError> {
        self.fetch_typed(ResourceKind::Gallery, params).await
    }

    pub async fn home_sections(&self) -> Result<Vec<HomeSection>, ApiError> {
        self.fetch_typed(ResourceKind::Home, &QueryParams::new())
            .await
    }

    /// `POST /contact`. Never cached; returns the server's confirmation.
    pub async fn submit_contact(
        &self,
        submission: &ContactSubmission,
    ) -> Result<Option<String>, ApiError> {
        let _loading = LoadingGuard::start(&self.pending);

        let body = serde_json::to_value(submission)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        match self.client.post_json("/contact", body).await {
            Ok(envelope) => {
                info!(email = %submission.email, "Contact form submitted");
                Ok(envelope.message)
            }
            Err(e) => {
                error!(error = %e, "Contact submission failed");
                self.record_error(&e, CONTACT_SUBMIT_FAILED);
                Err(e)
            }
        }
    }

    pub async fn clear_cache(&self, kind: Option<ResourceKind>) {
        self.cache.invalidate(kind).await;
    }

    pub async fn cache_ages(&self) -> CacheAges {
        self.cache.ages().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::ScriptedTransport;
    use crate::api::{Method, RequestBody};
    use crate::auth::{MemoryTokenStore, Session};
    use crate::cache::{CacheKeying, CacheOptions, InFlight};
    use crate::navigation::Router;
    use serde_json::json;
    use std::time::Duration;

    fn service(transport: Arc<ScriptedTransport>, options: CacheOptions) -> DataService {
        let client = ApiClient::new(
            transport,
            Arc::new(MemoryTokenStore::new()),
            Arc::new(Router::new("/courses")),
            Arc::new(Session::new()),
        );
        DataService::new(Arc::new(client), Arc::new(ResourceCache::new(options)))
    }

    fn course_page(title: &str) -> Value {
        json!({
            "courses": [{"_id": "c1", "title": title}],
            "pagination": {"total": 1}
        })
    }

    #[tokio::test]
    async fn test_accessor_sends_query_and_caches() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok_data(Method::Get, "/courses", course_page("NEET Foundation"));
        let data = service(transport.clone(), CacheOptions::default());

        let list = data.courses(&QueryParams::new().limit(50)).await.unwrap();
        let again = data.courses(&QueryParams::new().limit(50)).await.unwrap();

        assert_eq!(list.courses[0].title, "NEET Foundation");
        assert_eq!(again, list);
        assert_eq!(transport.count(Method::Get, "/courses"), 1);
        assert_eq!(
            transport.requests()[0].endpoint(),
            "/courses?limit=50"
        );
    }

    #[tokio::test]
    async fn test_featured_fetch_is_shadowed_by_earlier_limit_fetch() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok_data(Method::Get, "/courses", course_page("All courses page"));
        transport.ok_data(Method::Get, "/courses", course_page("Featured only"));
        let data = service(transport.clone(), CacheOptions::default());

        data.fetch_courses(&QueryParams::new().limit(50)).await.unwrap();
        let featured = data
            .fetch_courses(&QueryParams::new().featured(true))
            .await
            .unwrap();

        assert_eq!(featured, course_page("All courses page"));
        assert_eq!(transport.count(Method::Get, "/courses"), 1);
    }

    #[tokio::test]
    async fn test_per_query_keying_fetches_featured_separately() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok_data(Method::Get, "/courses", course_page("All courses page"));
        transport.ok_data(Method::Get, "/courses", course_page("Featured only"));
        let data = service(
            transport.clone(),
            CacheOptions {
                keying: CacheKeying::PerQuery,
                ..CacheOptions::default()
            },
        );

        data.fetch_courses(&QueryParams::new().limit(50)).await.unwrap();
        let featured = data
            .fetch_courses(&QueryParams::new().featured(true))
            .await
            .unwrap();

        assert_eq!(featured, course_page("Featured only"));
        assert_eq!(transport.count(Method::Get, "/courses"), 2);
    }

    #[tokio::test]
    async fn test_failure_sets_error_until_cleared() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::Get, "/toppers", 500, json!({"message": "Database unavailable"}));
        transport.ok_data(Method::Get, "/gallery", json!({"items": []}));
        transport.respond(Method::Get, "/home", 502, json!({}));
        let data = service(transport, CacheOptions::default());

        assert!(data.fetch_toppers(&QueryParams::new()).await.is_err());
        assert_eq!(data.last_error().as_deref(), Some("Database unavailable"));

        // A success leaves the previous error in place.
        data.gallery(&QueryParams::new()).await.unwrap();
        assert_eq!(data.last_error().as_deref(), Some("Database unavailable"));

        assert!(data.fetch_home_sections().await.is_err());
        assert_eq!(data.last_error().as_deref(), Some(FETCH_FAILED));

        data.clear_error();
        assert_eq!(data.last_error(), None);
    }

    #[tokio::test]
    async fn test_loading_flag_tracks_overlapping_calls() {
        let transport = Arc::new(
            ScriptedTransport::new().with_delay(Duration::from_millis(30)),
        );
        transport.ok_data(Method::Get, "/achievements", json!({"achievements": []}));
        transport.ok_data(Method::Get, "/gallery", json!({"items": []}));
        let data = Arc::new(service(transport, CacheOptions::default()));
        assert!(!data.is_loading());

        let first = {
            let data = Arc::clone(&data);
            tokio::spawn(async move { data.fetch_achievements(&QueryParams::new()).await })
        };
        let second = {
            let data = Arc::clone(&data);
            tokio::spawn(async move { data.fetch_gallery(&QueryParams::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(data.is_loading());

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        assert!(!data.is_loading());
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce_by_default() {
        let transport = Arc::new(
            ScriptedTransport::new().with_delay(Duration::from_millis(20)),
        );
        transport.ok_data(Method::Get, "/toppers", json!({"toppers": []}));
        let data = service(transport.clone(), CacheOptions::default());

        let query = QueryParams::new();
        let (a, b) = tokio::join!(data.fetch_toppers(&query), data.fetch_toppers(&query));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(transport.count(Method::Get, "/toppers"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_each_fetch_when_independent() {
        let transport = Arc::new(
            ScriptedTransport::new().with_delay(Duration::from_millis(20)),
        );
        transport.ok_data(Method::Get, "/toppers", json!({"toppers": []}));
        let data = service(
            transport.clone(),
            CacheOptions {
                in_flight: InFlight::Independent,
                ..CacheOptions::default()
            },
        );

        let query = QueryParams::new();
        let (a, b) = tokio::join!(data.fetch_toppers(&query), data.fetch_toppers(&query));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(transport.count(Method::Get, "/toppers"), 2);
    }

    #[tokio::test]
    async fn test_submit_contact_bypasses_cache() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            Method::Post,
            "/contact",
            201,
            json!({"success": true, "message": "Thank you for contacting us"}),
        );
        let data = service(transport.clone(), CacheOptions::default());
        let submission = ContactSubmission {
            name: "Priya Nair".into(),
            email: "priya@example.com".into(),
            phone: "9876543210".into(),
            course: None,
            subject: "Batch timings".into(),
            message: "When does the evening batch start?".into(),
        };

        for _ in 0..2 {
            let message = data.submit_contact(&submission).await.unwrap();
            assert_eq!(message.as_deref(), Some("Thank you for contacting us"));
        }

        assert_eq!(transport.count(Method::Post, "/contact"), 2);
        match &transport.requests()[0].body {
            Some(RequestBody::Json(body)) => {
                assert_eq!(body["subject"], "Batch timings");
                assert!(body.get("course").is_none());
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_contact_failure_uses_fallback() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::Post, "/contact", 502, json!({}));
        let data = service(transport, CacheOptions::default());

        assert!(data
            .submit_contact(&ContactSubmission::default())
            .await
            .is_err());
        assert_eq!(data.last_error().as_deref(), Some(CONTACT_SUBMIT_FAILED));
        assert!(!data.is_loading());
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok_data(Method::Get, "/home", json!([{"section": "hero"}]));
        let data = service(transport.clone(), CacheOptions::default());

        data.home_sections().await.unwrap();
        data.clear_cache(Some(ResourceKind::Home)).await;
        let sections = data.home_sections().await.unwrap();

        assert_eq!(sections[0].section, "hero");
        assert_eq!(transport.count(Method::Get, "/home"), 2);
        assert_eq!(data.cache_ages().await.home.as_deref(), Some("just now"));
    }
}
