//! Local cache of search result pages
//!
//! This module defines the `CacheStore` contract the coordinator relies on and
//! two implementations: a file-backed store that persists pages as JSON files
//! in an XDG-compliant cache directory, and an in-memory store for ephemeral
//! sessions. Both provide atomic upsert-by-key and atomic deletes, so the
//! coordinator performs no locking of its own.

mod manager;
mod memory;

pub use manager::FileCacheStore;
pub use memory::MemoryCacheStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::MovieSummary;

/// Maximum age before a cached page is considered stale
pub const CACHE_TTL_HOURS: i64 = 24;

/// The cache time-to-live as a chrono duration
pub fn cache_ttl() -> Duration {
    Duration::hours(CACHE_TTL_HOURS)
}

/// Errors raised by a cache store
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing files failed
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A cache entry could not be encoded or decoded
    #[error("cache entry is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Moving a freshly written entry into place failed
    #[error("failed to persist cache entry: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// The blocking file operation panicked or was cancelled
    #[error("cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One cached page of search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    /// Normalized query (see [`normalize_query`])
    pub query: String,
    /// 1-based page number
    pub page: u32,
    /// Items in catalog order
    pub items: Vec<MovieSummary>,
    /// When the page was fetched from the catalog
    pub fetched_at: DateTime<Utc>,
}

impl CachedPage {
    /// Creates a page stamped with the current time
    pub fn new(query: impl Into<String>, page: u32, items: Vec<MovieSummary>) -> Self {
        Self {
            query: query.into(),
            page,
            items,
            fetched_at: Utc::now(),
        }
    }

    /// Whether this page is younger than the cache TTL at `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < cache_ttl()
    }
}

/// Normalizes a user query into its cache key form
///
/// Trims, collapses internal whitespace runs to a single space and lowercases,
/// so `"  The  Dark Knight"` and `"the dark knight"` share cache entries.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Persistent keyed store of result pages
///
/// Keys are `(normalized query, page)`. Implementations must make `upsert`
/// and the delete operations atomic with respect to concurrent callers.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the page stored under `(query, page)`, fresh or not
    async fn get(&self, query: &str, page: u32) -> Result<Option<CachedPage>, CacheError>;

    /// Inserts the page, replacing any entry with the same key
    async fn upsert(&self, page: &CachedPage) -> Result<(), CacheError>;

    /// Deletes entries fetched before `cutoff`, returning how many were removed
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError>;

    /// Deletes every entry, returning how many were removed
    async fn clear_all(&self) -> Result<usize, CacheError>;

    /// Number of stored entries
    async fn count(&self) -> Result<usize, CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_query_trims_collapses_and_lowercases() {
        assert_eq!(normalize_query("  The  Dark\tKnight "), "the dark knight");
        assert_eq!(normalize_query("Batman"), "batman");
        assert_eq!(normalize_query("   "), "");
    }

    #[test]
    fn test_cached_page_freshness_boundary() {
        let now = Utc::now();
        let mut page = CachedPage::new("batman", 1, Vec::new());

        page.fetched_at = now - Duration::hours(23);
        assert!(page.is_fresh_at(now));

        page.fetched_at = now - Duration::hours(24);
        assert!(!page.is_fresh_at(now), "an entry exactly TTL old is stale");

        page.fetched_at = now - Duration::hours(48);
        assert!(!page.is_fresh_at(now));
    }
}
