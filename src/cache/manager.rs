//! File-backed cache store
//!
//! Stores each `(query, page)` entry as a JSON file in the cache directory.
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so readers never observe a half-written entry. File operations run
//! on tokio's blocking pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{CacheError, CacheStore, CachedPage};

/// File name prefix for search page entries
const ENTRY_PREFIX: &str = "search_";

/// Persists cached pages to disk
///
/// The store keeps its files in an XDG-compliant cache directory
/// (`~/.cache/moviecache/` on Linux). Only files it created (prefixed
/// `search_`, suffixed `.json`) are counted or deleted.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl FileCacheStore {
    /// Creates a store using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "moviecache")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a store rooted at a custom directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory holding the cache files
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path of the entry for `(query, page)`
    ///
    /// The name holds a SHA-256 digest of the query, so its length is fixed
    /// however long the query is. The query itself is kept in the entry.
    fn entry_path(&self, query: &str, page: u32) -> PathBuf {
        let digest = hex::encode(Sha256::digest(query.as_bytes()));
        self.cache_dir
            .join(format!("{ENTRY_PREFIX}{digest}_p{page}.json"))
    }

    /// Runs a file operation on the blocking pool against a clone of the store
    async fn blocking<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&FileCacheStore) -> Result<T, CacheError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(&store)).await?
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Lists entry files; a missing directory has no entries
    fn entry_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_entry = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(ENTRY_PREFIX) && name.ends_with(".json"));
            if is_entry {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn read_entry(path: &Path) -> Result<Option<CachedPage>, CacheError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Removes a file, treating "already gone" as success
    fn remove_entry(path: &Path) -> Result<bool, CacheError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn get_sync(&self, query: &str, page: u32) -> Result<Option<CachedPage>, CacheError> {
        let entry = Self::read_entry(&self.entry_path(query, page))?;
        // A digest collision must not serve another query's page
        Ok(entry.filter(|entry| entry.query == query && entry.page == page))
    }

    fn upsert_sync(&self, page: &CachedPage) -> Result<(), CacheError> {
        self.ensure_dir()?;

        let json = serde_json::to_string_pretty(page)?;
        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(self.entry_path(&page.query, page.page))?;

        debug!(query = %page.query, page = page.page, items = page.items.len(), "Cache entry written");
        Ok(())
    }

    fn delete_older_than_sync(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.entry_files()? {
            match Self::read_entry(&path) {
                Ok(Some(entry)) if entry.fetched_at < cutoff => {
                    if Self::remove_entry(&path)? {
                        removed += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    // Unreadable entries can never be served; sweep them too
                    warn!(path = %path.display(), error = %e, "Removing unreadable cache entry");
                    if Self::remove_entry(&path)? {
                        removed += 1;
                    }
                }
            }
        }
        Ok(removed)
    }

    fn clear_all_sync(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.entry_files()? {
            if Self::remove_entry(&path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, query: &str, page: u32) -> Result<Option<CachedPage>, CacheError> {
        let query = query.to_string();
        self.blocking(move |store| store.get_sync(&query, page)).await
    }

    async fn upsert(&self, page: &CachedPage) -> Result<(), CacheError> {
        let page = page.clone();
        self.blocking(move |store| store.upsert_sync(&page)).await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        self.blocking(move |store| store.delete_older_than_sync(cutoff))
            .await
    }

    async fn clear_all(&self) -> Result<usize, CacheError> {
        self.blocking(|store| store.clear_all_sync()).await
    }

    async fn count(&self) -> Result<usize, CacheError> {
        self.blocking(|store| Ok(store.entry_files()?.len())).await
    }
}
