//! Paging state for an active search
//!
//! `PaginationController` tracks the current query, page and accumulated
//! results on top of the `CacheCoordinator`. Each fetch runs as a spawned task;
//! the resulting state is published through a `tokio::sync::watch` channel so
//! new subscribers immediately see the latest value.
//!
//! State machine: `Idle → Loading → Loaded ⇄ LoadingMore`, with `Exhausted`
//! once every known result is accumulated and `Failed` when page 1 could not
//! be loaded. Any new search leaves `Exhausted` or `Failed`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::normalize_query;
use crate::coordinator::{CacheCoordinator, FailureReason, SearchOutcome, Source};
use crate::data::MovieSummary;

/// Position in the paging state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No search has been made
    #[default]
    Idle,
    /// Fetching page 1 of a new search
    Loading,
    /// At least one page is loaded and nothing is in flight
    Loaded,
    /// Fetching a page after the first
    LoadingMore,
    /// Every result the catalog reported has been accumulated
    Exhausted,
    /// Page 1 could not be loaded
    Failed,
}

/// Informational signal attached to the latest state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// There is nothing further to load; not an error
    NoMoreResults,
    /// Results came from a stale cache entry
    Cached(String),
    /// The fetch failed with a presentable reason
    Failed(FailureReason),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::NoMoreResults => write!(f, "No more results available"),
            Notice::Cached(note) => write!(f, "{note}"),
            Notice::Failed(reason) => write!(f, "{reason}"),
        }
    }
}

/// Paging state for one search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationState {
    /// Query as entered (trimmed)
    pub query: String,
    /// Last page requested; 0 before any search
    pub page: u32,
    /// Results so far, deduplicated by id in first-seen order
    pub accumulated: Vec<MovieSummary>,
    /// Total hits reported by the catalog; only set from a direct network response
    pub total_known: Option<u32>,
    /// Whether a fetch is in flight
    pub loading: bool,
    pub phase: Phase,
    pub notice: Option<Notice>,
    /// Bumped on every new search; fetch results from an older generation are discarded
    generation: u64,
}

impl PaginationState {
    /// Whether every result the catalog reported has been accumulated
    pub fn is_exhausted(&self) -> bool {
        self.total_known
            .is_some_and(|total| self.accumulated.len() >= total as usize)
    }

    /// Resets to the start of a new search
    fn restart(&mut self, query: String) {
        *self = PaginationState {
            query,
            page: 1,
            loading: true,
            phase: Phase::Loading,
            generation: self.generation + 1,
            ..PaginationState::default()
        };
    }
}

/// What `new_search` (or `refresh`) did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStart {
    /// Page 1 is being fetched
    Started,
    /// The same query already has page-1 results; nothing was done
    Duplicate,
    /// The query was blank; nothing was done
    EmptyQuery,
}

/// What `load_more` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// The next page is being fetched
    Started,
    /// A fetch is already in flight; the request was dropped
    AlreadyLoading,
    /// All known results are loaded; a "no more results" notice was published
    Exhausted,
    /// Nothing has been loaded yet
    NothingLoaded,
}

/// Drives paging for one search context
///
/// Must be used from within a Tokio runtime: fetches are spawned tasks.
/// Dropping the controller aborts any in-flight fetch.
pub struct PaginationController {
    coordinator: Arc<CacheCoordinator>,
    state: Arc<watch::Sender<PaginationState>>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl PaginationController {
    pub fn new(coordinator: Arc<CacheCoordinator>) -> Self {
        let (state, _) = watch::channel(PaginationState::default());
        Self {
            coordinator,
            state: Arc::new(state),
            in_flight: Mutex::new(None),
        }
    }

    /// Subscribes to state changes; the current state is available immediately
    pub fn subscribe(&self) -> watch::Receiver<PaginationState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> PaginationState {
        self.state.borrow().clone()
    }

    /// Waits until no fetch is in flight and returns that state
    pub async fn settled(&self) -> PaginationState {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Starts a new search for `query`
    ///
    /// Does nothing if `query` is the current query and page 1 already has
    /// results. Otherwise abandons any in-flight fetch, resets paging and
    /// fetches page 1.
    pub fn new_search(&self, query: &str) -> SearchStart {
        self.start(query, false)
    }

    /// Clears the whole cache and re-runs the current query from page 1
    pub fn refresh(&self) -> SearchStart {
        let query = self.state.borrow().query.clone();
        self.start(&query, true)
    }

    /// Fetches the next page of the current search
    ///
    /// Dropped while a fetch is in flight. When the known total is already
    /// accumulated, publishes a "no more results" notice instead of fetching.
    pub fn load_more(&self) -> LoadMore {
        let mut in_flight = self.lock_in_flight();
        let mut result = LoadMore::NothingLoaded;
        let mut request = None;

        // Check-and-set happens under the channel's write lock
        self.state.send_if_modified(|state| {
            if state.loading {
                result = LoadMore::AlreadyLoading;
                return false;
            }
            if state.accumulated.is_empty() {
                result = LoadMore::NothingLoaded;
                return false;
            }
            if state.is_exhausted() {
                state.phase = Phase::Exhausted;
                state.notice = Some(Notice::NoMoreResults);
                result = LoadMore::Exhausted;
                return true;
            }

            state.page += 1;
            state.loading = true;
            state.phase = Phase::LoadingMore;
            state.notice = None;
            request = Some((state.generation, state.query.clone(), state.page));
            result = LoadMore::Started;
            true
        });

        match result {
            LoadMore::AlreadyLoading => debug!("Fetch already in flight, dropping load_more"),
            LoadMore::Exhausted => debug!("All results loaded"),
            _ => {}
        }

        if let Some((generation, query, page)) = request {
            *in_flight = Some(self.spawn_fetch(generation, query, page, false));
        }
        result
    }

    /// Deletes expired cache entries; failures are only logged
    pub async fn clear_expired_cache(&self) {
        self.coordinator.clear_expired().await;
    }

    fn start(&self, query: &str, force: bool) -> SearchStart {
        let query = query.trim();
        if query.is_empty() {
            return SearchStart::EmptyQuery;
        }

        let mut in_flight = self.lock_in_flight();
        let mut generation = 0;
        let started = self.state.send_if_modified(|state| {
            let duplicate = normalize_query(&state.query) == normalize_query(query)
                && state.page == 1
                && !state.accumulated.is_empty();
            if duplicate && !force {
                return false;
            }
            state.restart(query.to_string());
            generation = state.generation;
            true
        });

        if !started {
            debug!(query, "Skipping duplicate search");
            return SearchStart::Duplicate;
        }

        if let Some(previous) = in_flight.take() {
            previous.abort();
        }
        debug!(query, generation, force, "Starting new search");
        *in_flight = Some(self.spawn_fetch(generation, query.to_string(), 1, force));
        SearchStart::Started
    }

    fn spawn_fetch(
        &self,
        generation: u64,
        query: String,
        page: u32,
        clear_cache_first: bool,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(&self.coordinator);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            if clear_cache_first {
                coordinator.clear_all().await;
            }
            let outcome = coordinator.fetch_page(&query, page).await;
            state.send_if_modified(|state| apply_outcome(state, generation, page, outcome));
        })
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PaginationController {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_in_flight().take() {
            handle.abort();
        }
    }
}

/// Folds a fetch outcome into the state, returning whether anything changed
///
/// Outcomes from an abandoned search (older generation) are discarded.
fn apply_outcome(
    state: &mut PaginationState,
    generation: u64,
    page: u32,
    outcome: SearchOutcome,
) -> bool {
    if state.generation != generation || state.page != page {
        debug!(generation, page, "Discarding result of abandoned fetch");
        return false;
    }

    state.loading = false;
    match outcome {
        SearchOutcome::Success { items, source } => {
            let total = match source {
                Source::Network { total_results } => total_results,
                Source::Cache => None,
            };
            merge_page(state, page, items, total, None);
        }
        SearchOutcome::PartialSuccess { items, note } => {
            merge_page(state, page, items, None, Some(note));
        }
        SearchOutcome::Failure { reason } if page <= 1 => {
            state.accumulated.clear();
            state.phase = Phase::Failed;
            state.notice = Some(Notice::Failed(reason));
        }
        SearchOutcome::Failure { reason } => {
            // Roll back so the next load_more retries this page
            state.page = page - 1;
            state.phase = Phase::Loaded;
            state.notice = Some(match reason {
                FailureReason::NoResults => Notice::NoMoreResults,
                other => Notice::Failed(other),
            });
        }
    }
    true
}

fn merge_page(
    state: &mut PaginationState,
    page: u32,
    items: Vec<MovieSummary>,
    total: Option<u32>,
    note: Option<String>,
) {
    let mut seen: HashSet<String> = state.accumulated.iter().map(|m| m.id.clone()).collect();
    let before = state.accumulated.len();
    for item in items {
        if seen.insert(item.id.clone()) {
            state.accumulated.push(item);
        }
    }
    let added = state.accumulated.len() - before;

    if let Some(total) = total {
        state.total_known = Some(total);
    }

    state.notice = note.map(Notice::Cached);
    if added == 0 && page > 1 {
        state.notice = Some(Notice::NoMoreResults);
    }

    state.phase = if state.is_exhausted() {
        Phase::Exhausted
    } else {
        Phase::Loaded
    };
    debug!(query = %state.query, page, added, total = state.accumulated.len(), "Merged page");
}
