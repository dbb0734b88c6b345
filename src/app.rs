//! Command execution for the moviecache binary
//!
//! Wires the catalog client, cache store, coordinator and pagination
//! controller together for each command and prints the results.

use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use moviecache::cache::{CacheStore, FileCacheStore, MemoryCacheStore};
use moviecache::cli::{CacheAction, CliError, Command, StartupConfig};
use moviecache::coordinator::{CacheCoordinator, FailureReason};
use moviecache::data::{MovieDetail, OmdbClient};
use moviecache::pagination::{
    LoadMore, Notice, PaginationController, PaginationState, Phase, SearchStart,
};
use moviecache::search_input::{SearchDebouncer, SearchIntent, SEARCH_DEBOUNCE};

/// Errors that end a command unsuccessfully
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Cli(#[from] CliError),

    #[error("failed to set up HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("search failed: {0}")]
    SearchFailed(FailureReason),

    #[error("lookup of {id} failed: {reason}")]
    DetailFailed { id: String, reason: FailureReason },
}

/// A line of interactive input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// The search box now reads this text
    Edit(String),
    /// Search for this text right away
    Submit(String),
    More,
    Refresh,
    Count,
    Clear,
    Quit,
    Unknown(String),
}

/// Parses one line of interactive input
pub fn parse_input(line: &str) -> Input {
    let Some(command) = line.trim_start().strip_prefix(':') else {
        return Input::Edit(line.to_string());
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .unwrap_or((command, ""));
    match name.trim() {
        "search" | "s" => Input::Submit(rest.trim().to_string()),
        "more" | "m" => Input::More,
        "refresh" | "r" => Input::Refresh,
        "count" => Input::Count,
        "clear" => Input::Clear,
        "quit" | "q" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

/// Application wiring shared by all commands
pub struct App {
    config: StartupConfig,
    coordinator: Arc<CacheCoordinator>,
}

impl App {
    /// Builds the client, store and coordinator from the startup configuration
    pub fn new(config: StartupConfig) -> Result<Self, AppError> {
        // The key is only checked by commands that reach the catalog
        let client = OmdbClient::with_base_url(
            config.api_key.clone().unwrap_or_default(),
            config.base_url.clone(),
            config.timeout,
        )?;
        let store = build_store(&config);
        let coordinator = Arc::new(CacheCoordinator::new(Arc::new(client), store));
        Ok(Self {
            config,
            coordinator,
        })
    }

    /// Runs a single command to completion
    pub async fn run(&self, command: Command) -> Result<(), AppError> {
        match command {
            Command::Search { query, pages } => {
                self.config.require_api_key()?;
                self.search(&query.join(" "), pages).await
            }
            Command::Detail { ids } => {
                self.config.require_api_key()?;
                self.detail(&ids).await
            }
            Command::Cache { action } => {
                self.cache(action).await;
                Ok(())
            }
            Command::Interactive => {
                self.config.require_api_key()?;
                self.interactive().await
            }
        }
    }

    /// Loads up to `pages` pages of results and prints them
    async fn search(&self, query: &str, pages: u32) -> Result<(), AppError> {
        let controller = PaginationController::new(Arc::clone(&self.coordinator));
        if controller.new_search(query) == SearchStart::EmptyQuery {
            return Err(AppError::SearchFailed(FailureReason::NoResults));
        }

        let mut state = controller.settled().await;
        while state.page < pages && state.phase == Phase::Loaded {
            if controller.load_more() != LoadMore::Started {
                break;
            }
            let next = controller.settled().await;
            let advanced = next.page > state.page;
            state = next;
            if !advanced || state.notice == Some(Notice::NoMoreResults) {
                break;
            }
        }

        print_results(&state);
        match (&state.phase, &state.notice) {
            (Phase::Failed, Some(Notice::Failed(reason))) => {
                Err(AppError::SearchFailed(reason.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Looks up all ids concurrently and prints each detail
    async fn detail(&self, ids: &[String]) -> Result<(), AppError> {
        let lookups = ids.iter().map(|id| self.coordinator.fetch_detail(id));
        let results = join_all(lookups).await;

        let mut first_failure = None;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(detail) => print_detail(&detail),
                Err(reason) => {
                    eprintln!("{id}: {reason}");
                    first_failure.get_or_insert(AppError::DetailFailed {
                        id: id.clone(),
                        reason,
                    });
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn cache(&self, action: CacheAction) {
        match action {
            CacheAction::Count => {
                println!("{} cached pages", self.coordinator.count().await);
            }
            CacheAction::Clear { expired } => {
                let before = self.coordinator.count().await;
                if expired {
                    self.coordinator.clear_expired().await;
                } else {
                    self.coordinator.clear_all().await;
                }
                let after = self.coordinator.count().await;
                println!("Removed {} cached pages", before.saturating_sub(after));
            }
        }
    }

    /// Line-based session: edits are debounced, `:` lines are commands
    ///
    /// At end of input the last edit is submitted, so piped input still searches.
    async fn interactive(&self) -> Result<(), AppError> {
        let controller = PaginationController::new(Arc::clone(&self.coordinator));
        controller.clear_expired_cache().await;

        let (mut debouncer, mut intents) = SearchDebouncer::new(SEARCH_DEBOUNCE);
        let mut updates = controller.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut pending_edit: Option<String> = None;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        if let Some(edit) = pending_edit.take() {
                            debouncer.on_query_submitted(&edit);
                            while let Ok(intent) = intents.try_recv() {
                                apply_intent(&controller, intent);
                            }
                            print_results(&controller.settled().await);
                        }
                        break;
                    };

                    pending_edit = None;
                    match parse_input(&line) {
                        Input::Edit(text) => {
                            debouncer.on_query_changed(&text);
                            pending_edit = Some(text);
                        }
                        Input::Submit(text) => debouncer.on_query_submitted(&text),
                        Input::More => match controller.load_more() {
                            LoadMore::Started => {}
                            LoadMore::AlreadyLoading => println!("(still loading)"),
                            LoadMore::Exhausted => {}
                            LoadMore::NothingLoaded => println!("(search for something first)"),
                        },
                        Input::Refresh => {
                            if controller.refresh() == SearchStart::EmptyQuery {
                                println!("(search for something first)");
                            }
                        }
                        Input::Count => println!("{} cached pages", self.coordinator.count().await),
                        Input::Clear => {
                            self.coordinator.clear_all().await;
                            println!("Cache cleared");
                        }
                        Input::Quit => break,
                        Input::Unknown(name) => println!("Unknown command: :{name}"),
                    }
                }
                Some(intent) = intents.recv() => apply_intent(&controller, intent),
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = updates.borrow_and_update().clone();
                    if !state.loading && state.phase != Phase::Idle {
                        print_results(&state);
                    }
                }
            }
        }
        Ok(())
    }
}

fn apply_intent(controller: &PaginationController, intent: SearchIntent) {
    match intent {
        SearchIntent::Search(query) => {
            controller.new_search(&query);
        }
        SearchIntent::Reset => println!("(search cleared)"),
    }
}

/// Picks the cache store for this run
fn build_store(config: &StartupConfig) -> Arc<dyn CacheStore> {
    if !config.persist {
        return Arc::new(MemoryCacheStore::new());
    }

    let store = match &config.cache_dir {
        Some(dir) => Some(FileCacheStore::with_dir(dir.clone())),
        None => FileCacheStore::new(),
    };
    match store {
        Some(store) => Arc::new(store),
        None => {
            warn!("No cache directory available, caching in memory only");
            Arc::new(MemoryCacheStore::new())
        }
    }
}

/// Renders the accumulated results and any notice
pub fn format_results(state: &PaginationState) -> String {
    let mut out = String::new();
    for (i, movie) in state.accumulated.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {} ({}) [{}] {}\n",
            i + 1,
            movie.title,
            movie.year,
            movie.media_type.label(),
            movie.id
        ));
    }

    if !state.accumulated.is_empty() {
        let total = state
            .total_known
            .map_or_else(|| "?".to_string(), |t| t.to_string());
        out.push_str(&format!(
            "-- {} of {} results for \"{}\" (page {})\n",
            state.accumulated.len(),
            total,
            state.query,
            state.page
        ));
    }

    if let Some(notice) = &state.notice {
        out.push_str(&format!("note: {notice}\n"));
    }
    out
}

fn print_results(state: &PaginationState) {
    print!("{}", format_results(state));
}

fn print_detail(detail: &MovieDetail) {
    println!("{} ({}) [{}]", detail.title, detail.year, detail.id);
    let fields = [
        ("Rated", &detail.rated),
        ("Released", &detail.released),
        ("Runtime", &detail.runtime),
        ("Genre", &detail.genre),
        ("Director", &detail.director),
        ("Writer", &detail.writer),
        ("Actors", &detail.actors),
        ("Language", &detail.language),
        ("Country", &detail.country),
        ("Awards", &detail.awards),
        ("IMDb rating", &detail.imdb_rating),
        ("Box office", &detail.box_office),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {label}: {value}");
        }
    }
    for rating in &detail.ratings {
        println!("  • {}: {}", rating.source, rating.value);
    }
    if let Some(plot) = &detail.plot {
        println!();
        println!("  {plot}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use moviecache::data::{MediaType, MovieSummary};

    #[test]
    fn test_parse_input_plain_line_is_edit() {
        assert_eq!(parse_input("batman"), Input::Edit("batman".to_string()));
        assert_eq!(parse_input(""), Input::Edit(String::new()));
    }

    #[test]
    fn test_parse_input_commands() {
        assert_eq!(parse_input(":more"), Input::More);
        assert_eq!(parse_input(":m"), Input::More);
        assert_eq!(parse_input(":refresh"), Input::Refresh);
        assert_eq!(parse_input(":count"), Input::Count);
        assert_eq!(parse_input(":clear"), Input::Clear);
        assert_eq!(parse_input("  :q"), Input::Quit);
        assert_eq!(
            parse_input(":search the dark knight "),
            Input::Submit("the dark knight".to_string())
        );
        assert_eq!(parse_input(":bogus"), Input::Unknown("bogus".to_string()));
    }

    #[test]
    fn test_format_results_lists_items_and_notice() {
        let mut state = PaginationState::default();
        state.query = "batman".to_string();
        state.page = 1;
        state.accumulated = vec![MovieSummary {
            id: "tt0372784".to_string(),
            title: "Batman Begins".to_string(),
            year: "2005".to_string(),
            poster_url: None,
            media_type: MediaType::Movie,
        }];
        state.notice = Some(Notice::Cached("offline — showing cached results".to_string()));

        let out = format_results(&state);

        assert!(out.contains("  1. Batman Begins (2005) [movie] tt0372784"));
        assert!(out.contains("-- 1 of ? results for \"batman\" (page 1)"));
        assert!(out.contains("note: offline — showing cached results"));
    }

    #[test]
    fn test_format_results_failure_only_shows_notice() {
        let mut state = PaginationState::default();
        state.query = "zzz".to_string();
        state.page = 1;
        state.phase = Phase::Failed;
        state.notice = Some(Notice::Failed(FailureReason::NoResults));

        assert_eq!(format_results(&state), "note: no results\n");
    }
}
