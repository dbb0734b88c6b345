//! Debounced search-as-you-type
//!
//! Turns a stream of raw input edits into search intents. Each edit cancels the
//! pending evaluation before arming a new one, so only the input that stays
//! unchanged for the debounce delay triggers a search. Intents are delivered
//! through a tokio channel to whoever drives the `PaginationController`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Delay an input must stay unchanged before it is searched
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Inputs shorter than this (in characters) never schedule a search
pub const MIN_SEARCH_LENGTH: usize = 2;

/// Messages sent from the debouncer to the search driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchIntent {
    /// Run a search for the query
    Search(String),
    /// The input was cleared; return to the default view
    Reset,
}

/// Debounces raw input into `SearchIntent`s
///
/// Must be used from within a Tokio runtime.
pub struct SearchDebouncer {
    delay: Duration,
    sender: mpsc::Sender<SearchIntent>,
    /// Scheduled evaluation, if any
    pending: Option<JoinHandle<()>>,
    /// Last query emitted as a search
    last_query: Arc<Mutex<String>>,
}

impl SearchDebouncer {
    /// Creates a debouncer and the receiver its intents arrive on
    pub fn new(delay: Duration) -> (Self, mpsc::Receiver<SearchIntent>) {
        let (sender, receiver) = mpsc::channel(32);
        let debouncer = Self {
            delay,
            sender,
            pending: None,
            last_query: Arc::new(Mutex::new(String::new())),
        };
        (debouncer, receiver)
    }

    /// Handles an edit of the search input
    ///
    /// Empty input resets immediately; input shorter than
    /// [`MIN_SEARCH_LENGTH`] schedules nothing; anything else is searched
    /// after the debounce delay unless it was the last query searched.
    pub fn on_query_changed(&mut self, input: &str) {
        self.cancel();
        let query = input.trim().to_string();

        if query.is_empty() {
            debug!("Search input cleared");
            self.set_last_query(String::new());
            self.emit(SearchIntent::Reset);
            return;
        }

        if query.chars().count() < MIN_SEARCH_LENGTH {
            debug!(query = %query, "Search input too short, ignoring");
            return;
        }

        let delay = self.delay;
        let sender = self.sender.clone();
        let last_query = Arc::clone(&self.last_query);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut last = last_query.lock().unwrap_or_else(PoisonError::into_inner);
                if *last == query {
                    return;
                }
                *last = query.clone();
            }
            let _ = sender.send(SearchIntent::Search(query)).await;
        }));
    }

    /// Handles an explicit submit; searches immediately, bypassing the debounce
    pub fn on_query_submitted(&mut self, input: &str) {
        self.cancel();
        let query = input.trim().to_string();

        if query.is_empty() {
            self.set_last_query(String::new());
            self.emit(SearchIntent::Reset);
        } else {
            self.set_last_query(query.clone());
            self.emit(SearchIntent::Search(query));
        }
    }

    /// Cancels any scheduled evaluation
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    fn set_last_query(&self, query: String) {
        *self.last_query.lock().unwrap_or_else(PoisonError::into_inner) = query;
    }

    fn emit(&self, intent: SearchIntent) {
        if let Err(e) = self.sender.try_send(intent) {
            warn!(error = %e, "Dropping search intent");
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
