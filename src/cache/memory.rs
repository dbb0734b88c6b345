//! In-memory cache store for sessions that should not touch disk

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{CacheError, CacheStore, CachedPage};

type Key = (String, u32);

/// Process-local cache store
///
/// Every operation runs under a single lock, which makes upsert and delete
/// atomic for concurrent callers.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    pages: Mutex<HashMap<Key, CachedPage>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Key, CachedPage>> {
        // A panic while holding the lock cannot leave a half-applied entry behind
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, query: &str, page: u32) -> Result<Option<CachedPage>, CacheError> {
        Ok(self.lock().get(&(query.to_string(), page)).cloned())
    }

    async fn upsert(&self, page: &CachedPage) -> Result<(), CacheError> {
        self.lock()
            .insert((page.query.clone(), page.page), page.clone());
        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        let mut pages = self.lock();
        let before = pages.len();
        pages.retain(|_, entry| entry.fetched_at >= cutoff);
        Ok(before - pages.len())
    }

    async fn clear_all(&self) -> Result<usize, CacheError> {
        let mut pages = self.lock();
        let removed = pages.len();
        pages.clear();
        Ok(removed)
    }

    async fn count(&self) -> Result<usize, CacheError> {
        Ok(self.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_upsert_replaces_existing_key() {
        let store = MemoryCacheStore::new();
        store.upsert(&CachedPage::new("q", 1, Vec::new())).await.unwrap();
        store.upsert(&CachedPage::new("q", 1, Vec::new())).await.unwrap();
        store.upsert(&CachedPage::new("q", 2, Vec::new())).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_older_than_and_clear_all() {
        let store = MemoryCacheStore::new();
        let mut old = CachedPage::new("old", 1, Vec::new());
        old.fetched_at = Utc::now() - Duration::hours(25);
        store.upsert(&old).await.unwrap();
        store.upsert(&CachedPage::new("new", 1, Vec::new())).await.unwrap();

        let removed = store
            .delete_older_than(Utc::now() - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.get("old", 1).await.unwrap().is_none());

        assert_eq!(store.clear_all().await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
