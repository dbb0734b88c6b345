//! Cache-first retrieval with offline fallback
//!
//! The `CacheCoordinator` answers page requests from the local cache while it
//! is fresh, goes to the catalog otherwise, and falls back to stale cache
//! entries when the catalog is unreachable or reports a failure.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{cache_ttl, normalize_query, CacheStore, CachedPage};
use crate::data::omdb::declared_not_found;
use crate::data::{CatalogClient, CatalogError, MovieDetail, MovieSummary, SearchStatus};

/// Note attached to stale results served after a declared failure or empty answer
pub const NOTE_CACHED: &str = "showing cached results";

/// Note attached to stale results served after a transport failure
pub const NOTE_OFFLINE: &str = "offline — showing cached results";

/// Why a fetch produced no usable items
///
/// The `Display` text is meant to be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("No internet connection. Please check your network.")]
    NetworkUnreachable,

    #[error("Request timed out. Please try again.")]
    Timeout,

    #[error("Secure connection failed. Please check your internet connection and try again.")]
    SecureConnection,

    #[error("Authentication failed. Invalid API key.")]
    Unauthorized,

    #[error("Resource not found.")]
    NotFound,

    #[error("Server error ({0}). Please try again later.")]
    ServerError(u16),

    #[error("The catalog sent a response we could not read.")]
    InvalidResponse,

    /// The catalog answered but reported a failure other than "not found"
    #[error("{0}")]
    ServerDeclaredError(String),

    #[error("no results")]
    NoResults,
}

impl From<&CatalogError> for FailureReason {
    fn from(err: &CatalogError) -> Self {
        match err {
            CatalogError::Unreachable(_) => FailureReason::NetworkUnreachable,
            CatalogError::Timeout => FailureReason::Timeout,
            CatalogError::Tls(_) => FailureReason::SecureConnection,
            CatalogError::Status(401 | 403) => FailureReason::Unauthorized,
            CatalogError::Status(404) => FailureReason::NotFound,
            CatalogError::Status(code) => FailureReason::ServerError(*code),
            CatalogError::Decode(_) => FailureReason::InvalidResponse,
            CatalogError::Declared(message) => declared_reason(message),
        }
    }
}

/// Classifies a catalog-declared failure message
fn declared_reason(message: &str) -> FailureReason {
    if declared_not_found(message) {
        FailureReason::NoResults
    } else {
        FailureReason::ServerDeclaredError(message.to_string())
    }
}

/// Where a successful page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A fresh cache entry; the catalog was not contacted
    Cache,
    /// A direct catalog response
    Network { total_results: Option<u32> },
}

/// Result of a page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Fresh data, from the cache or the catalog
    Success {
        items: Vec<MovieSummary>,
        source: Source,
    },
    /// Stale cache served because the catalog could not answer
    PartialSuccess {
        items: Vec<MovieSummary>,
        note: String,
    },
    /// Nothing to show
    Failure { reason: FailureReason },
}

impl SearchOutcome {
    /// Items carried by the outcome; empty for failures
    pub fn items(&self) -> &[MovieSummary] {
        match self {
            SearchOutcome::Success { items, .. } | SearchOutcome::PartialSuccess { items, .. } => {
                items
            }
            SearchOutcome::Failure { .. } => &[],
        }
    }
}

/// Orchestrates cache lookups, catalog calls and fallback selection
///
/// Both collaborators are injected; the store may be shared with other
/// coordinators and controllers.
pub struct CacheCoordinator {
    client: Arc<dyn CatalogClient>,
    store: Arc<dyn CacheStore>,
}

impl CacheCoordinator {
    pub fn new(client: Arc<dyn CatalogClient>, store: Arc<dyn CacheStore>) -> Self {
        Self { client, store }
    }

    /// Fetches one page of results for `query`
    ///
    /// # Behavior
    /// - A fresh cache entry is returned without contacting the catalog
    /// - A non-empty catalog answer is cached (overwriting) and returned
    /// - An empty answer or declared failure falls back to any cached entry
    ///   ("showing cached results"), else fails
    /// - A transport error falls back to any cached entry
    ///   ("offline — showing cached results"), else fails with the classified reason
    ///
    /// Page `0` is treated as page `1`.
    pub async fn fetch_page(&self, query: &str, page: u32) -> SearchOutcome {
        let query = normalize_query(query);
        let page = page.max(1);

        if query.is_empty() {
            return SearchOutcome::Failure {
                reason: FailureReason::NoResults,
            };
        }

        let cached = self.lookup(&query, page).await;
        if let Some(entry) = &cached {
            if entry.is_fresh_at(Utc::now()) {
                debug!(query = %query, page, items = entry.items.len(), "Serving fresh cache entry");
                return SearchOutcome::Success {
                    items: entry.items.clone(),
                    source: Source::Cache,
                };
            }
        }

        debug!(query = %query, page, "Cache missing or stale, querying catalog");
        match self.client.search(&query, page).await {
            Ok(response) => match response.status {
                SearchStatus::Ok if !response.items.is_empty() => {
                    self.store_page(CachedPage::new(query.clone(), page, response.items.clone()))
                        .await;
                    SearchOutcome::Success {
                        items: response.items,
                        source: Source::Network {
                            total_results: response.total_results,
                        },
                    }
                }
                SearchStatus::Ok => {
                    debug!(query = %query, page, "Catalog returned no items");
                    Self::fallback(cached, NOTE_CACHED, FailureReason::NoResults)
                }
                SearchStatus::DeclaredError(message) => {
                    debug!(query = %query, page, message = %message, "Catalog declared failure");
                    Self::fallback(cached, NOTE_CACHED, declared_reason(&message))
                }
            },
            Err(err) => {
                warn!(query = %query, page, error = %err, "Catalog request failed");
                Self::fallback(cached, NOTE_OFFLINE, FailureReason::from(&err))
            }
        }
    }

    /// Fetches full details for a single catalog id
    ///
    /// Detail lookups are not cached.
    pub async fn fetch_detail(&self, id: &str) -> Result<MovieDetail, FailureReason> {
        let id = id.trim();
        if id.is_empty() {
            return Err(FailureReason::NoResults);
        }

        self.client.detail(id).await.map_err(|err| {
            warn!(id, error = %err, "Detail request failed");
            FailureReason::from(&err)
        })
    }

    /// Deletes cache entries older than the TTL
    ///
    /// Failures are logged, never returned.
    pub async fn clear_expired(&self) {
        let cutoff = Utc::now() - cache_ttl();
        match self.store.delete_older_than(cutoff).await {
            Ok(removed) => info!(removed, "Cleared expired cache entries"),
            Err(e) => warn!(error = %e, "Failed to clear expired cache entries"),
        }
    }

    /// Deletes every cache entry
    ///
    /// Failures are logged, never returned.
    pub async fn clear_all(&self) {
        match self.store.clear_all().await {
            Ok(removed) => info!(removed, "Cleared all cache entries"),
            Err(e) => warn!(error = %e, "Failed to clear cache"),
        }
    }

    /// Number of cached pages, or 0 if the store cannot be read
    pub async fn count(&self) -> usize {
        self.store.count().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to count cache entries");
            0
        })
    }

    /// Reads the cache entry for a key; unreadable or empty entries count as missing
    async fn lookup(&self, query: &str, page: u32) -> Option<CachedPage> {
        match self.store.get(query, page).await {
            Ok(entry) => entry.filter(|entry| !entry.items.is_empty()),
            Err(e) => {
                warn!(query, page, error = %e, "Failed to read cache entry");
                None
            }
        }
    }

    /// Writes a page to the cache; a failed write never fails the fetch
    async fn store_page(&self, page: CachedPage) {
        if let Err(e) = self.store.upsert(&page).await {
            warn!(query = %page.query, page = page.page, error = %e, "Cache write failed");
        }
    }

    fn fallback(cached: Option<CachedPage>, note: &str, reason: FailureReason) -> SearchOutcome {
        match cached {
            Some(entry) => {
                info!(query = %entry.query, page = entry.page, note, "Falling back to cached page");
                SearchOutcome::PartialSuccess {
                    items: entry.items,
                    note: note.to_string(),
                }
            }
            None => SearchOutcome::Failure { reason },
        }
    }
}
