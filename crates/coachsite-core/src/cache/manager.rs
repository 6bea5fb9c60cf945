use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::api::{ApiError, QueryParams};
use crate::models::ResourceKind;

/// Cached content is served without a network call for 5 minutes.
pub const DEFAULT_FRESHNESS_SECS: i64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.cached_at
    }

    pub fn age_display(&self) -> String {
        let seconds = self.age().num_seconds();
        if seconds < 60 {
            // Includes negative ages from clock skew
            "just now".to_string()
        } else if seconds < 3600 {
            format!("{}m ago", seconds / 60)
        } else {
            format!("{}h ago", seconds / 3600)
        }
    }

    /// Fresh while `now - cached_at < window`.
    pub fn is_fresh(&self, window: Duration) -> bool {
        self.age() < window
    }
}

/// How query parameters map onto cache slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeying {
    /// One slot per category. A fetch with different parameters inside the
    /// freshness window gets whatever was cached last for that category.
    #[default]
    PerCategory,
    /// One slot per category and rendered query string.
    PerQuery,
}

/// What happens when a second miss for a slot arrives while the first
/// request is still pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlight {
    /// Join the pending request; one network call serves every caller.
    #[default]
    Coalesce,
    /// Issue another request; the last response to land wins the slot.
    Independent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    pub freshness: Duration,
    pub keying: CacheKeying,
    pub in_flight: InFlight,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            freshness: Duration::seconds(DEFAULT_FRESHNESS_SECS),
            keying: CacheKeying::default(),
            in_flight: InFlight::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SlotKey {
    kind: ResourceKind,
    query: Option<String>,
}

type FetchFuture = BoxFuture<'static, Result<Value, ApiError>>;
type PendingFetch = Shared<FetchFuture>;

#[derive(Default)]
struct CacheState {
    slots: HashMap<SlotKey, CachedData<Value>>,
    /// Bumped by every invalidation of a category; responses to requests
    /// started under an older generation are not stored.
    generations: HashMap<ResourceKind, u64>,
    /// Weak so that a request nobody awaits any more is dropped rather
    /// than kept suspended for the next caller.
    in_flight: HashMap<SlotKey, (u64, WeakShared<FetchFuture>)>,
    next_request_id: u64,
}

impl CacheState {
    fn generation(&self, kind: ResourceKind) -> u64 {
        self.generations.get(&kind).copied().unwrap_or(0)
    }

    fn bump(&mut self, kind: ResourceKind) {
        *self.generations.entry(kind).or_insert(0) += 1;
    }
}

/// In-memory content cache with one slot per resource category.
///
/// Entries are replaced wholesale by each successful fetch and never
/// evicted by age; a stale entry simply stops being served. A failed
/// refresh leaves whatever was there untouched.
pub struct ResourceCache {
    state: Arc<Mutex<CacheState>>,
    options: CacheOptions,
}

impl ResourceCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            options,
        }
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    fn slot_key(&self, kind: ResourceKind, query: &QueryParams) -> SlotKey {
        match self.options.keying {
            CacheKeying::PerCategory => SlotKey { kind, query: None },
            CacheKeying::PerQuery => SlotKey {
                kind,
                query: Some(query.to_query_string()),
            },
        }
    }

    /// Serve `kind` from cache while fresh, otherwise run `fetch` and store
    /// its result.
    ///
    /// `fetch` is only called on a miss. Its future is driven by whichever
    /// caller awaits it; if every caller is dropped before it resolves, the
    /// request is dropped with them and nothing is written. A later miss
    /// starts a new request.
    pub async fn fetch_with_cache<F, Fut>(
        &self,
        kind: ResourceKind,
        query: &QueryParams,
        fetch: F,
    ) -> Result<Value, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        let key = self.slot_key(kind, query);

        let pending = {
            let mut state = self.state.lock().await;

            if let Some(entry) = state.slots.get(&key) {
                if entry.is_fresh(self.options.freshness) {
                    debug!(cache = kind.cache_key(), age = %entry.age_display(), "Cache hit");
                    return Ok(entry.data.clone());
                }
            }

            let joined = match self.options.in_flight {
                InFlight::Coalesce => {
                    let live = state.in_flight.get(&key).map(|(_, weak)| weak.upgrade());
                    if let Some(None) = live {
                        debug!(cache = kind.cache_key(), "Pending request was abandoned");
                        state.in_flight.remove(&key);
                    }
                    live.flatten()
                }
                InFlight::Independent => None,
            };

            match joined {
                Some(pending) => {
                    debug!(cache = kind.cache_key(), "Joining in-flight request");
                    pending
                }
                None => {
                    debug!(cache = kind.cache_key(), "Cache miss, fetching");
                    state.next_request_id += 1;
                    let request_id = state.next_request_id;
                    let generation = state.generation(kind);
                    let pending = self.store_on_completion(
                        key.clone(),
                        request_id,
                        generation,
                        fetch(),
                    );
                    if self.options.in_flight == InFlight::Coalesce {
                        if let Some(weak) = pending.downgrade() {
                            state.in_flight.insert(key, (request_id, weak));
                        }
                    }
                    pending
                }
            }
        };

        pending.await
    }

    /// Wrap a fetch so that whoever drives it also records the outcome.
    fn store_on_completion<Fut>(
        &self,
        key: SlotKey,
        request_id: u64,
        generation: u64,
        fetch: Fut,
    ) -> PendingFetch
    where
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        async move {
            let result = fetch.await;
            let mut state = state.lock().await;

            if matches!(state.in_flight.get(&key), Some((id, _)) if *id == request_id) {
                state.in_flight.remove(&key);
            }

            match &result {
                Ok(value) if state.generation(key.kind) == generation => {
                    state.slots.insert(key, CachedData::new(value.clone()));
                }
                Ok(_) => {
                    debug!(cache = key.kind.cache_key(), "Slot invalidated mid-request, not storing");
                }
                Err(e) => {
                    debug!(cache = key.kind.cache_key(), error = %e, "Fetch failed, keeping existing entry");
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Clear one category, or every category when `kind` is `None`.
    ///
    /// Pending requests for the cleared categories are abandoned: their
    /// responses still reach their callers but are not stored.
    pub async fn invalidate(&self, kind: Option<ResourceKind>) {
        let mut state = self.state.lock().await;
        let kinds: Vec<ResourceKind> = match kind {
            Some(kind) => vec![kind],
            None => ResourceKind::ALL.to_vec(),
        };
        for kind in kinds {
            state.slots.retain(|key, _| key.kind != kind);
            state.in_flight.retain(|key, _| key.kind != kind);
            state.bump(kind);
            debug!(cache = kind.cache_key(), "Cache invalidated");
        }
    }

    /// Current entry for `kind`/`query`, fresh or not.
    pub async fn peek(&self, kind: ResourceKind, query: &QueryParams) -> Option<CachedData<Value>> {
        let key = self.slot_key(kind, query);
        self.state.lock().await.slots.get(&key).cloned()
    }

    pub async fn is_fresh(&self, kind: ResourceKind, query: &QueryParams) -> bool {
        self.peek(kind, query)
            .await
            .map(|entry| entry.is_fresh(self.options.freshness))
            .unwrap_or(false)
    }

    /// Age of the newest entry per category, for status display.
    pub async fn ages(&self) -> CacheAges {
        let state = self.state.lock().await;
        let mut ages = CacheAges::default();
        for kind in ResourceKind::ALL {
            let newest = state
                .slots
                .iter()
                .filter(|(key, _)| key.kind == kind)
                .map(|(_, entry)| entry)
                .max_by_key(|entry| entry.cached_at);
            if let Some(entry) = newest {
                ages.set(kind, entry.age_display());
            }
        }
        ages
    }

    #[cfg(test)]
    pub(crate) async fn backdate(&self, kind: ResourceKind, by: Duration) {
        let mut state = self.state.lock().await;
        for (_, entry) in state.slots.iter_mut().filter(|(key, _)| key.kind == kind) {
            entry.cached_at = entry.cached_at - by;
        }
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheAges {
    pub courses: Option<String>,
    pub toppers: Option<String>,
    pub achievements: Option<String>,
    pub gallery: Option<String>,
    pub home: Option<String>,
}

impl CacheAges {
    fn set(&mut self, kind: ResourceKind, age: String) {
        let slot = match kind {
            ResourceKind::Courses => &mut self.courses,
            ResourceKind::Toppers => &mut self.toppers,
            ResourceKind::Achievements => &mut self.achievements,
            ResourceKind::Gallery => &mut self.gallery,
            ResourceKind::Home => &mut self.home,
        };
        *slot = Some(age);
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&str> {
        match kind {
            ResourceKind::Courses => self.courses.as_deref(),
            ResourceKind::Toppers => self.toppers.as_deref(),
            ResourceKind::Achievements => self.achievements.as_deref(),
            ResourceKind::Gallery => self.gallery.as_deref(),
            ResourceKind::Home => self.home.as_deref(),
        }
    }

    /// First known age in category order, or "never".
    pub fn last_updated(&self) -> String {
        ResourceKind::ALL
            .iter()
            .find_map(|kind| self.get(*kind))
            .unwrap_or("never")
            .to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
