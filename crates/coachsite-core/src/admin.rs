//! Admin-area operations: content CRUD, contact inbox and dashboard.
//!
//! Every call here needs a signed-in admin; a rejected token goes through
//! the client's 401 policy like any other request. Listings read straight
//! from the backend so an editor always sees what was just saved, and
//! every successful write clears the public cache for that category.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, Method, MultipartForm, QueryParams, RequestBody};
use crate::cache::ResourceCache;
use crate::models::{decode, Contact, ContactList, ContactStats, ContactUpdate, Envelope, ResourceKind};

/// Page size the admin listings ask for.
pub const ADMIN_LIST_LIMIT: u32 = 100;

/// Headline counts for the admin landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub courses: u64,
    pub toppers: u64,
    pub achievements: u64,
    pub gallery: u64,
    pub contacts: u64,
    pub unread_contacts: u64,
}

pub struct AdminService {
    client: Arc<ApiClient>,
    cache: Arc<ResourceCache>,
}

impl AdminService {
    pub fn new(client: Arc<ApiClient>, cache: Arc<ResourceCache>) -> Self {
        Self { client, cache }
    }

    /// Item path. Home sections are addressed by section name, everything
    /// else by `_id`.
    fn item_path(kind: ResourceKind, key: &str) -> String {
        format!("{}/{}", kind.endpoint(), key)
    }

    pub async fn list(&self, kind: ResourceKind, params: &QueryParams) -> Result<Value, ApiError> {
        self.client.get_data(kind.endpoint(), params).await
    }

    pub async fn create(
        &self,
        kind: ResourceKind,
        form: MultipartForm,
    ) -> Result<Envelope<Value>, ApiError> {
        let envelope = self
            .client
            .send(
                Method::Post,
                kind.endpoint(),
                &QueryParams::new(),
                Some(RequestBody::Form(form)),
            )
            .await?;
        info!(category = kind.cache_key(), "Created");
        self.cache.invalidate(Some(kind)).await;
        Ok(envelope)
    }

    pub async fn update(
        &self,
        kind: ResourceKind,
        key: &str,
        form: MultipartForm,
    ) -> Result<Envelope<Value>, ApiError> {
        let envelope = self
            .client
            .send(
                Method::Put,
                &Self::item_path(kind, key),
                &QueryParams::new(),
                Some(RequestBody::Form(form)),
            )
            .await?;
        info!(category = kind.cache_key(), key, "Updated");
        self.cache.invalidate(Some(kind)).await;
        Ok(envelope)
    }

    pub async fn delete(&self, kind: ResourceKind, key: &str) -> Result<Option<String>, ApiError> {
        let envelope = self.client.delete(&Self::item_path(kind, key)).await?;
        info!(category = kind.cache_key(), key, "Deleted");
        self.cache.invalidate(Some(kind)).await;
        Ok(envelope.message)
    }

    pub async fn list_contacts(&self, params: &QueryParams) -> Result<ContactList, ApiError> {
        self.client.get_data("/contact", params).await.and_then(decode)
    }

    /// Fetch one message. The backend marks it read as a side effect.
    pub async fn view_contact(&self, id: &str) -> Result<Contact, ApiError> {
        self.client
            .get_data(&format!("/contact/{}", id), &QueryParams::new())
            .await
            .and_then(decode)
    }

    pub async fn update_contact(
        &self,
        id: &str,
        update: &ContactUpdate,
    ) -> Result<Option<String>, ApiError> {
        let body = serde_json::to_value(update)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let envelope = self
            .client
            .put_json(&format!("/contact/{}", id), body)
            .await?;
        Ok(envelope.message)
    }

    pub async fn delete_contact(&self, id: &str) -> Result<Option<String>, ApiError> {
        let envelope = self.client.delete(&format!("/contact/{}", id)).await?;
        Ok(envelope.message)
    }

    pub async fn contact_stats(&self) -> Result<ContactStats, ApiError> {
        self.client
            .get_data("/contact/stats", &QueryParams::new())
            .await
            .and_then(decode)
    }

    async fn total(&self, kind: ResourceKind) -> Result<u64, ApiError> {
        let data = self
            .client
            .get_data(kind.endpoint(), &QueryParams::new().limit(1))
            .await?;
        let total = data
            .pointer("/pagination/total")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        debug!(category = kind.cache_key(), total, "Counted");
        Ok(total)
    }

    /// All five requests run concurrently; any failure fails the whole call.
    pub async fn dashboard(&self) -> Result<DashboardStats, ApiError> {
        let (courses, toppers, achievements, gallery, contacts) = futures::try_join!(
            self.total(ResourceKind::Courses),
            self.total(ResourceKind::Toppers),
            self.total(ResourceKind::Achievements),
            self.total(ResourceKind::Gallery),
            self.contact_stats(),
        )?;

        Ok(DashboardStats {
            courses,
            toppers,
            achievements,
            gallery,
            contacts: contacts.total_contacts,
            unread_contacts: contacts.unread_contacts,
        })
    }
}
