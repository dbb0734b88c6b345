//! Core data models for the movie catalog
//!
//! This module contains the value types shared by the catalog client, the page
//! cache and the pagination controller.

pub mod omdb;

pub use omdb::{CatalogClient, CatalogError, OmdbClient, SearchResponse, SearchStatus};

use serde::{Deserialize, Serialize};

/// Kind of catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Series,
    Episode,
    Game,
    /// Anything the catalog reports that we don't model
    #[serde(other)]
    Other,
}

impl MediaType {
    /// Parses the catalog's `Type` field, case-insensitively
    pub fn from_catalog(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "movie" => MediaType::Movie,
            "series" => MediaType::Series,
            "episode" => MediaType::Episode,
            "game" => MediaType::Game,
            _ => MediaType::Other,
        }
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
            MediaType::Episode => "episode",
            MediaType::Game => "game",
            MediaType::Other => "other",
        }
    }
}

/// A single search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieSummary {
    /// Stable catalog identifier (IMDb id, e.g. `tt0372784`)
    pub id: String,
    /// Title as reported by the catalog
    pub title: String,
    /// Release year, or a range such as `2005–2008` for series
    pub year: String,
    /// Poster image URL, absent when the catalog has none
    pub poster_url: Option<String>,
    /// Kind of entry
    pub media_type: MediaType,
}

/// A third-party rating attached to a title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    /// Rating source (e.g. "Rotten Tomatoes")
    pub source: String,
    /// Rating value as displayed by the source (e.g. "85%")
    pub value: String,
}

/// Full details for a single title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: String,
    pub title: String,
    pub year: String,
    pub rated: Option<String>,
    pub released: Option<String>,
    pub runtime: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub writer: Option<String>,
    pub actors: Option<String>,
    pub plot: Option<String>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub awards: Option<String>,
    pub poster_url: Option<String>,
    pub ratings: Vec<Rating>,
    pub imdb_rating: Option<String>,
    pub box_office: Option<String>,
    pub media_type: MediaType,
}

/// Maps the catalog's `N/A` placeholder (and blank strings) to `None`
pub(crate) fn non_placeholder(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let v = v.trim();
        !v.is_empty() && !v.eq_ignore_ascii_case("N/A")
    })
}
