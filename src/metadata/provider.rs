//! Trait definition and types for descriptive metadata providers.
//!
//! This module defines the [`MetadataProvider`] trait that movie database
//! backends implement, along with the shared data types returned by provider
//! queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// A single result returned from a movie search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Provider-specific identifier for this movie (e.g. TMDB numeric ID).
    pub id: String,
    /// Display title of the movie.
    pub title: String,
    /// Release year, if known.
    pub year: Option<u16>,
    /// Short synopsis / overview text.
    pub overview: Option<String>,
    /// How confident the provider is that this result matches the query (0.0 - 1.0).
    pub confidence: f64,
    /// Full poster URL, if the movie has one.
    pub poster_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Details
// ---------------------------------------------------------------------------

/// Full details for one movie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetails {
    /// Provider-specific identifier.
    pub id: String,
    /// Canonical title.
    pub title: Option<String>,
    /// Year of the release date.
    pub year: Option<u16>,
    /// Name of the first credited director.
    pub director: Option<String>,
    /// Synopsis / overview text.
    pub overview: Option<String>,
    /// Full poster URL.
    pub poster_url: Option<String>,
    /// IMDb identifier (e.g. `tt0133093`).
    pub imdb_id: Option<String>,
}

/// Descriptive metadata for one video record, as stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveMetadata {
    pub title: Option<String>,
    pub release_year: Option<u16>,
    pub director: Option<String>,
    pub overview: Option<String>,
    pub cover_image_url: Option<String>,
    /// Movie database identifier.
    pub external_movie_id: Option<String>,
    /// IMDb identifier.
    pub external_alt_id: Option<String>,
}

impl DescriptiveMetadata {
    /// Combine a chosen search result with its details. Details win; the
    /// search result fills gaps.
    pub fn from_lookup(result: SearchResult, details: MovieDetails) -> Self {
        Self {
            title: details
                .title
                .filter(|t| !t.trim().is_empty())
                .or_else(|| Some(result.title).filter(|t| !t.trim().is_empty())),
            release_year: details.year.or(result.year),
            director: details.director,
            overview: details
                .overview
                .filter(|o| !o.trim().is_empty())
                .or(result.overview.filter(|o| !o.trim().is_empty())),
            cover_image_url: details.poster_url.or(result.poster_url),
            external_movie_id: Some(details.id),
            external_alt_id: details.imdb_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Async trait that movie metadata providers implement.
///
/// Providers are shared across the per-file tasks of a sync pass, so they are
/// held behind an `Arc`.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"tmdb"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider has credentials and can serve requests.
    fn is_available(&self) -> bool;

    /// Search for movies matching `title`, optionally constrained by `year`.
    ///
    /// Results are sorted by descending `confidence`.
    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> anyhow::Result<Vec<SearchResult>>;

    /// Fetch full details for a movie identified by `provider_id`.
    async fn get_movie_details(&self, provider_id: &str) -> anyhow::Result<MovieDetails>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> SearchResult {
        SearchResult {
            id: "603".to_string(),
            title: "The Matrix".to_string(),
            year: Some(1999),
            overview: Some("From search".to_string()),
            confidence: 0.8,
            poster_url: Some("https://image.tmdb.org/t/p/w500/search.jpg".to_string()),
        }
    }

    #[test]
    fn details_take_precedence() {
        let details = MovieDetails {
            id: "603".to_string(),
            title: Some("The Matrix".to_string()),
            year: Some(1999),
            director: Some("Lana Wachowski".to_string()),
            overview: Some("From details".to_string()),
            poster_url: Some("https://image.tmdb.org/t/p/w500/details.jpg".to_string()),
            imdb_id: Some("tt0133093".to_string()),
        };

        let meta = DescriptiveMetadata::from_lookup(result(), details);
        assert_eq!(meta.title.as_deref(), Some("The Matrix"));
        assert_eq!(meta.overview.as_deref(), Some("From details"));
        assert_eq!(
            meta.cover_image_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/details.jpg")
        );
        assert_eq!(meta.external_movie_id.as_deref(), Some("603"));
        assert_eq!(meta.external_alt_id.as_deref(), Some("tt0133093"));
    }

    #[test]
    fn search_result_fills_gaps() {
        let details = MovieDetails {
            id: "603".to_string(),
            title: Some(String::new()),
            year: None,
            director: None,
            overview: None,
            poster_url: None,
            imdb_id: None,
        };

        let meta = DescriptiveMetadata::from_lookup(result(), details);
        assert_eq!(meta.title.as_deref(), Some("The Matrix"));
        assert_eq!(meta.release_year, Some(1999));
        assert_eq!(meta.overview.as_deref(), Some("From search"));
        assert!(meta.cover_image_url.is_some());
        assert_eq!(meta.director, None);
    }
}
