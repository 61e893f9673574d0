//! Descriptive metadata lookup.
//!
//! # Module layout
//!
//! - [`provider`] -- Trait definition and shared data types.
//! - [`providers`] -- Concrete provider implementations (TMDB).
//!
//! [`lookup_movie`] is what the sync engine calls: search, pick the best
//! candidate, fetch its details.

pub mod provider;
pub mod providers;

pub use provider::{DescriptiveMetadata, MetadataProvider, MovieDetails, SearchResult};

use anyhow::Context;
use tracing::debug;

/// Look up descriptive metadata for a parsed title.
///
/// Returns `Ok(None)` when the provider is unconfigured or the search has no
/// results. Errors from either request are returned to the caller.
pub async fn lookup_movie(
    provider: &dyn MetadataProvider,
    title: &str,
    year: Option<u16>,
) -> anyhow::Result<Option<DescriptiveMetadata>> {
    if !provider.is_available() {
        debug!(provider = provider.name(), "provider not configured, skipping lookup");
        return Ok(None);
    }

    let results = provider.search_movie(title, year).await?;
    let Some(best) = results.into_iter().next() else {
        debug!(title, ?year, "no search results");
        return Ok(None);
    };

    debug!(
        title,
        candidate = %best.title,
        id = %best.id,
        confidence = best.confidence,
        "selected lookup candidate"
    );

    let details = provider
        .get_movie_details(&best.id)
        .await
        .with_context(|| format!("failed to fetch details for {} {}", provider.name(), best.id))?;

    Ok(Some(DescriptiveMetadata::from_lookup(best, details)))
}
