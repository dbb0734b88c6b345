//! moviecache library
//!
//! Data-access layer for a movie catalog search client: a cache-first
//! coordinator over the OMDb catalog, a local page cache with a 24 hour TTL,
//! and the pagination state for an active search.

pub mod cache;
pub mod cli;
pub mod coordinator;
pub mod data;
pub mod pagination;
pub mod search_input;

#[cfg(test)]
mod test_support;
