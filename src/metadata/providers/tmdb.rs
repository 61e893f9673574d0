//! TMDB (The Movie Database) metadata provider.
//!
//! Implements [`MetadataProvider`] by querying the TMDB v3 REST API.
//!
//! Features:
//! - Token-bucket rate limiting at 4 requests / second via [`governor`].
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - 30-second request timeout.
//! - Confidence scoring based on title similarity and year proximity.
//! - Details fetched with credits and external IDs in one request.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::metadata::provider::{MetadataProvider, MovieDetails, SearchResult};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const TMDB_POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const REQUESTS_PER_SECOND: NonZeroU32 = match NonZeroU32::new(4) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieSearchResult {
    id: u64,
    title: Option<String>,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetail {
    id: u64,
    title: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    poster_path: Option<String>,
    imdb_id: Option<String>,
    credits: Option<TmdbCredits>,
    external_ids: Option<TmdbExternalIds>,
}

#[derive(Debug, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Deserialize)]
struct TmdbCrewMember {
    name: Option<String>,
    job: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbExternalIds {
    imdb_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// TMDB metadata provider.
///
/// Wraps the TMDB v3 REST API with built-in rate limiting, retry logic, and
/// confidence-scored search results.
///
/// # Examples
///
/// ```no_run
/// use reelshelf::metadata::providers::TmdbProvider;
///
/// let provider = TmdbProvider::new("your-api-key".into(), "en-US".into())?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct TmdbProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TmdbProvider {
    /// Create a new TMDB provider with the given API key and language.
    ///
    /// The `language` parameter should be a tag such as `"en-US"`. Rate
    /// limiting is configured at 4 requests per second.
    pub fn new(api_key: String, language: String) -> anyhow::Result<Self> {
        Self::with_base_url(api_key, language, TMDB_BASE_URL.to_string())
    }

    /// Create a provider that talks to `base_url` instead of the public API.
    pub fn with_base_url(
        api_key: String,
        language: String,
        base_url: String,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build TMDB HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            language,
            rate_limiter: RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND)),
        })
    }

    /// Execute a GET request with rate limiting and 429-retry logic.
    async fn get(&self, url: &str) -> anyhow::Result<reqwest::Response> {
        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("TMDB request failed: {}", self.redact(url)))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    "TMDB returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let resp = resp
                .error_for_status()
                .with_context(|| format!("TMDB request returned error: {}", self.redact(url)))?;

            return Ok(resp);
        }
    }

    /// Build a full API URL with the API key and language query parameters.
    fn url(&self, path: &str, extra_params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}{path}?api_key={}&language={}",
            self.base_url,
            urlencoded(&self.api_key),
            urlencoded(&self.language)
        );
        for (key, value) in extra_params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoded(value));
        }
        url
    }

    /// Strip the API key from a URL before it is logged.
    fn redact(&self, url: &str) -> String {
        if self.api_key.is_empty() {
            return url.to_string();
        }
        url.replace(&urlencoded(&self.api_key), "***")
    }

    /// Compute confidence score for a search result based on title similarity
    /// and year proximity.
    fn confidence(
        query_title: &str,
        result_title: &str,
        query_year: Option<u16>,
        result_year: Option<u16>,
    ) -> f64 {
        let base = if query_title == result_title {
            0.5
        } else if query_title.eq_ignore_ascii_case(result_title) {
            0.4
        } else if result_title
            .to_ascii_lowercase()
            .contains(&query_title.to_ascii_lowercase())
        {
            0.2
        } else {
            0.1
        };

        let year_bonus = match (query_year, result_year) {
            (Some(q), Some(r)) if q == r => 0.3,
            (Some(q), Some(r)) if q.abs_diff(r) <= 1 => 0.15,
            _ => 0.0,
        };

        base + year_bonus
    }
}

/// Minimal percent-encoding for query parameter values.
fn urlencoded(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0x0f) as usize]));
            }
        }
    }
    out
}

const HEX: [u8; 16] = *b"0123456789ABCDEF";

/// Extract a four-digit year from a date string like `"2023-04-15"`.
fn parse_year(date: &Option<String>) -> Option<u16> {
    date.as_deref()
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<u16>().ok())
}

/// Convert a TMDB poster path fragment to a full URL.
fn poster_url(path: &str) -> String {
    format!("{TMDB_POSTER_BASE}{path}")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> anyhow::Result<Vec<SearchResult>> {
        let mut params = vec![("query", title)];
        let year_str = year.map(|y| y.to_string());
        if let Some(ref y) = year_str {
            params.push(("year", y.as_str()));
        }

        let url = self.url("/search/movie", &params);
        debug!(title, ?year, "TMDB search movie");

        let body: TmdbSearchResponse<TmdbMovieSearchResult> = self
            .get(&url)
            .await?
            .json()
            .await
            .context("failed to parse TMDB movie search response")?;

        let mut results: Vec<SearchResult> = body
            .results
            .into_iter()
            .map(|r| {
                let result_title = r.title.unwrap_or_default();
                let result_year = parse_year(&r.release_date);
                let confidence = Self::confidence(title, &result_title, year, result_year);
                SearchResult {
                    id: r.id.to_string(),
                    title: result_title,
                    year: result_year,
                    overview: non_empty(r.overview),
                    confidence,
                    poster_url: non_empty(r.poster_path).map(|p| poster_url(&p)),
                }
            })
            .collect();

        // Stable: equal scores keep TMDB's relevance order.
        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(results)
    }

    async fn get_movie_details(&self, provider_id: &str) -> anyhow::Result<MovieDetails> {
        let url = self.url(
            &format!("/movie/{provider_id}"),
            &[("append_to_response", "credits,external_ids")],
        );
        debug!(provider_id, "TMDB get movie details");

        let detail: TmdbMovieDetail = self
            .get(&url)
            .await?
            .json()
            .await
            .context("failed to parse TMDB movie detail response")?;

        let director = detail.credits.and_then(|credits| {
            credits
                .crew
                .into_iter()
                .find(|member| member.job.as_deref() == Some("Director"))
                .and_then(|member| non_empty(member.name))
        });

        let imdb_id = detail
            .external_ids
            .and_then(|ids| non_empty(ids.imdb_id))
            .or_else(|| non_empty(detail.imdb_id));

        Ok(MovieDetails {
            id: detail.id.to_string(),
            title: non_empty(detail.title),
            year: parse_year(&detail.release_date),
            director,
            overview: non_empty(detail.overview),
            poster_url: non_empty(detail.poster_path).map(|p| poster_url(&p)),
            imdb_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_exact_title_match() {
        let score = TmdbProvider::confidence("Inception", "Inception", Some(2010), Some(2010));
        assert!((score - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_case_insensitive_match() {
        let score = TmdbProvider::confidence("the matrix", "The Matrix", None, None);
        assert!((score - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_contains_match() {
        let score = TmdbProvider::confidence("Alien", "Aliens", None, None);
        assert!((score - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_close_year() {
        let score = TmdbProvider::confidence("Dune", "Dune", Some(2021), Some(2020));
        assert!((score - 0.65).abs() < f64::EPSILON);
    }

    #[test]
    fn year_parsing() {
        assert_eq!(parse_year(&Some("1999-03-30".to_string())), Some(1999));
        assert_eq!(parse_year(&Some("".to_string())), None);
        assert_eq!(parse_year(&None), None);
    }

    #[test]
    fn poster_url_construction() {
        assert_eq!(
            poster_url("/abc123.jpg"),
            "https://image.tmdb.org/t/p/w500/abc123.jpg"
        );
    }

    #[test]
    fn url_building() {
        let provider =
            TmdbProvider::with_base_url("k y".into(), "en-US".into(), "http://localhost/3/".into())
                .unwrap();
        assert_eq!(
            provider.url("/search/movie", &[("query", "Alien & Aliens")]),
            "http://localhost/3/search/movie?api_key=k+y&language=en-US&query=Alien+%26+Aliens"
        );
    }

    #[test]
    fn redacts_api_key() {
        let provider = TmdbProvider::new("secret".into(), "en-US".into()).unwrap();
        let url = provider.url("/movie/1", &[]);
        assert!(!provider.redact(&url).contains("secret"));
    }

    #[test]
    fn provider_is_available() {
        let provider = TmdbProvider::new("test-key".into(), "en-US".into()).unwrap();
        assert!(provider.is_available());
        assert_eq!(provider.name(), "tmdb");

        let empty = TmdbProvider::new(String::new(), "en-US".into()).unwrap();
        assert!(!empty.is_available());
    }
}
