//! Test doubles for the catalog client and cache store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::cache::{CacheError, CacheStore, CachedPage};
use crate::data::{
    CatalogClient, CatalogError, MediaType, MovieDetail, MovieSummary, SearchResponse,
};

pub(crate) fn movie(id: &str) -> MovieSummary {
    MovieSummary {
        id: id.to_string(),
        title: format!("Title {id}"),
        year: "2005".to_string(),
        poster_url: None,
        media_type: MediaType::Movie,
    }
}

pub(crate) fn movies(ids: &[&str]) -> Vec<MovieSummary> {
    ids.iter().map(|id| movie(id)).collect()
}

/// Movies with ids `{prefix}{n}` for each `n` in `range`
pub(crate) fn numbered(prefix: &str, range: std::ops::Range<u32>) -> Vec<MovieSummary> {
    range.map(|n| movie(&format!("{prefix}{n}"))).collect()
}

pub(crate) fn detail(id: &str) -> MovieDetail {
    MovieDetail {
        id: id.to_string(),
        title: format!("Title {id}"),
        year: "2005".to_string(),
        rated: None,
        released: None,
        runtime: Some("140 min".to_string()),
        genre: None,
        director: Some("Christopher Nolan".to_string()),
        writer: None,
        actors: None,
        plot: None,
        language: None,
        country: None,
        awards: None,
        poster_url: None,
        ratings: Vec::new(),
        imdb_rating: None,
        box_office: None,
        media_type: MediaType::Movie,
    }
}

type Scripted = Result<SearchResponse, CatalogError>;

/// Scripted catalog that records every search call
///
/// Responses are queued per `(query, page)`; the last queued response repeats.
/// Unscripted searches answer with OMDb's "Movie not found!" declared error.
/// While held, calls block until released one at a time.
#[derive(Default)]
pub(crate) struct FakeCatalog {
    searches: Mutex<HashMap<(String, u32), VecDeque<Scripted>>>,
    details: Mutex<HashMap<String, Result<MovieDetail, CatalogError>>>,
    searched: Mutex<Vec<(String, u32)>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(&self, query: &str, page: u32, response: Scripted) {
        self.searches
            .lock()
            .unwrap()
            .entry((query.to_string(), page))
            .or_default()
            .push_back(response);
    }

    pub(crate) fn script_detail(&self, id: &str, response: Result<MovieDetail, CatalogError>) {
        self.details.lock().unwrap().insert(id.to_string(), response);
    }

    /// Makes subsequent calls wait for [`FakeCatalog::release`]
    pub(crate) fn hold(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Lets `n` held calls proceed
    pub(crate) fn release(&self, n: usize) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(n);
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.searched.lock().unwrap().len()
    }

    pub(crate) fn searched(&self) -> Vec<(String, u32)> {
        self.searched.lock().unwrap().clone()
    }

    async fn wait_for_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn search(&self, query: &str, page: u32) -> Result<SearchResponse, CatalogError> {
        self.searched.lock().unwrap().push((query.to_string(), page));
        self.wait_for_gate().await;

        let mut searches = self.searches.lock().unwrap();
        match searches.get_mut(&(query.to_string(), page)) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Ok(SearchResponse::declared_error("Movie not found!")),
        }
    }

    async fn detail(&self, id: &str) -> Result<MovieDetail, CatalogError> {
        self.details
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_else(|| Err(CatalogError::Declared("Incorrect IMDb ID.".to_string())))
    }
}

/// Store whose every operation fails
pub(crate) struct FailingStore;

fn broken() -> CacheError {
    CacheError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"))
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _query: &str, _page: u32) -> Result<Option<CachedPage>, CacheError> {
        Err(broken())
    }

    async fn upsert(&self, _page: &CachedPage) -> Result<(), CacheError> {
        Err(broken())
    }

    async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        Err(broken())
    }

    async fn clear_all(&self) -> Result<usize, CacheError> {
        Err(broken())
    }

    async fn count(&self) -> Result<usize, CacheError> {
        Err(broken())
    }
}
