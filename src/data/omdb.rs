//! OMDb catalog API client
//!
//! This module defines the `CatalogClient` seam used by the cache coordinator
//! and provides the production implementation backed by the OMDb HTTP API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::{non_placeholder, MediaType, MovieDetail, MovieSummary, Rating};

/// Base URL for the OMDb API
pub const OMDB_BASE_URL: &str = "https://www.omdbapi.com/";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport-level errors raised by a catalog client
///
/// A declared failure in a search response is *not* an error; it is reported
/// through `SearchStatus::DeclaredError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// DNS failure, connection refused, or other connect-level failure
    #[error("connection failed: {0}")]
    Unreachable(String),

    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// TLS handshake or certificate failure
    #[error("secure connection failed: {0}")]
    Tls(String),

    /// Non-success HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Body could not be read or parsed
    #[error("invalid response: {0}")]
    Decode(String),

    /// The catalog declared a failure for a detail lookup
    #[error("catalog error: {0}")]
    Declared(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return CatalogError::Timeout;
        }
        if let Some(status) = err.status() {
            return CatalogError::Status(status.as_u16());
        }
        if err.is_decode() {
            return CatalogError::Decode(err.to_string());
        }

        let chain = error_chain(&err);
        if looks_like_tls(&chain) {
            CatalogError::Tls(chain)
        } else {
            CatalogError::Unreachable(chain)
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Decode(err.to_string())
    }
}

/// Flattens an error and its sources into one message
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn looks_like_tls(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Whether a declared failure message means "nothing matched"
pub(crate) fn declared_not_found(message: &str) -> bool {
    message.to_lowercase().contains("not found")
}

/// Status reported in the body of a search response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    Ok,
    /// The catalog answered but reported a failure (e.g. "Movie not found!")
    DeclaredError(String),
}

/// Structured result of a search call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub status: SearchStatus,
    pub items: Vec<MovieSummary>,
    /// Total number of hits across all pages, when the catalog reports it
    pub total_results: Option<u32>,
}

impl SearchResponse {
    /// Successful response carrying `items`
    pub fn ok(items: Vec<MovieSummary>, total_results: Option<u32>) -> Self {
        Self {
            status: SearchStatus::Ok,
            items,
            total_results,
        }
    }

    /// Declared failure with the catalog's message
    pub fn declared_error(message: impl Into<String>) -> Self {
        Self {
            status: SearchStatus::DeclaredError(message.into()),
            items: Vec::new(),
            total_results: None,
        }
    }
}

/// Remote catalog the coordinator consults on a cache miss
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Searches the catalog for `query`, returning the 1-based `page`
    async fn search(&self, query: &str, page: u32) -> Result<SearchResponse, CatalogError>;

    /// Fetches full details for a single catalog id
    async fn detail(&self, id: &str) -> Result<MovieDetail, CatalogError>;
}

/// Search response as returned by OMDb
#[derive(Debug, Deserialize)]
struct OmdbSearchResponse {
    #[serde(rename = "Search")]
    search: Option<Vec<OmdbSearchItem>>,
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
}

/// A single search hit as returned by OMDb
#[derive(Debug, Deserialize)]
struct OmdbSearchItem {
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "Type", default)]
    media_type: String,
    #[serde(rename = "Poster")]
    poster: Option<String>,
}

impl From<OmdbSearchItem> for MovieSummary {
    fn from(item: OmdbSearchItem) -> Self {
        MovieSummary {
            id: item.imdb_id,
            title: item.title,
            year: item.year,
            poster_url: non_placeholder(item.poster),
            media_type: MediaType::from_catalog(&item.media_type),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmdbRating {
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "Value")]
    value: String,
}

/// Detail response as returned by OMDb
#[derive(Debug, Deserialize)]
struct OmdbDetailResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error")]
    error: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Rated")]
    rated: Option<String>,
    #[serde(rename = "Released")]
    released: Option<String>,
    #[serde(rename = "Runtime")]
    runtime: Option<String>,
    #[serde(rename = "Genre")]
    genre: Option<String>,
    #[serde(rename = "Director")]
    director: Option<String>,
    #[serde(rename = "Writer")]
    writer: Option<String>,
    #[serde(rename = "Actors")]
    actors: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Language")]
    language: Option<String>,
    #[serde(rename = "Country")]
    country: Option<String>,
    #[serde(rename = "Awards")]
    awards: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "Ratings", default)]
    ratings: Vec<OmdbRating>,
    #[serde(rename = "imdbRating")]
    imdb_rating: Option<String>,
    #[serde(rename = "BoxOffice")]
    box_office: Option<String>,
    #[serde(rename = "Type")]
    media_type: Option<String>,
}

/// Client for the OMDb API
#[derive(Debug, Clone)]
pub struct OmdbClient {
    client: Client,
    api_key: String,
    /// Base URL for the API (allows override for testing)
    base_url: String,
}

impl OmdbClient {
    /// Creates a client for the public OMDb endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_base_url(api_key, OMDB_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Creates a client against a custom endpoint and request timeout
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("moviecache/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    async fn get_text(&self, params: &[(&str, &str)]) -> Result<String, CatalogError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    /// Parses an OMDb search body
    fn parse_search(body: &str) -> Result<SearchResponse, CatalogError> {
        let parsed: OmdbSearchResponse = serde_json::from_str(body)?;

        if !parsed.response.eq_ignore_ascii_case("true") {
            let message = parsed
                .error
                .unwrap_or_else(|| "Unknown catalog error".to_string());
            return Ok(SearchResponse::declared_error(message));
        }

        let items = parsed
            .search
            .unwrap_or_default()
            .into_iter()
            .map(MovieSummary::from)
            .collect();
        let total_results = parsed
            .total_results
            .and_then(|total| total.trim().parse::<u32>().ok());

        Ok(SearchResponse::ok(items, total_results))
    }

    /// Parses an OMDb detail body
    fn parse_detail(body: &str) -> Result<MovieDetail, CatalogError> {
        let parsed: OmdbDetailResponse = serde_json::from_str(body)?;

        if !parsed.response.eq_ignore_ascii_case("true") {
            let message = parsed
                .error
                .unwrap_or_else(|| "Unknown catalog error".to_string());
            return Err(CatalogError::Declared(message));
        }

        let id = parsed
            .imdb_id
            .ok_or_else(|| CatalogError::Decode("missing field imdbID".to_string()))?;
        let title = parsed
            .title
            .ok_or_else(|| CatalogError::Decode("missing field Title".to_string()))?;

        Ok(MovieDetail {
            id,
            title,
            year: parsed.year.unwrap_or_default(),
            rated: non_placeholder(parsed.rated),
            released: non_placeholder(parsed.released),
            runtime: non_placeholder(parsed.runtime),
            genre: non_placeholder(parsed.genre),
            director: non_placeholder(parsed.director),
            writer: non_placeholder(parsed.writer),
            actors: non_placeholder(parsed.actors),
            plot: non_placeholder(parsed.plot),
            language: non_placeholder(parsed.language),
            country: non_placeholder(parsed.country),
            awards: non_placeholder(parsed.awards),
            poster_url: non_placeholder(parsed.poster),
            ratings: parsed
                .ratings
                .into_iter()
                .map(|r| Rating {
                    source: r.source,
                    value: r.value,
                })
                .collect(),
            imdb_rating: non_placeholder(parsed.imdb_rating),
            box_office: non_placeholder(parsed.box_office),
            media_type: parsed
                .media_type
                .as_deref()
                .map(MediaType::from_catalog)
                .unwrap_or(MediaType::Other),
        })
    }
}

#[async_trait]
impl CatalogClient for OmdbClient {
    async fn search(&self, query: &str, page: u32) -> Result<SearchResponse, CatalogError> {
        debug!(query, page, "OMDb search request");
        let page = page.to_string();
        let body = self.get_text(&[("s", query), ("page", &page)]).await?;
        Self::parse_search(&body)
    }

    async fn detail(&self, id: &str) -> Result<MovieDetail, CatalogError> {
        debug!(id, "OMDb detail request");
        let body = self.get_text(&[("i", id), ("plot", "full")]).await?;
        Self::parse_detail(&body)
    }
}
