//! Listing and filtering of catalogued videos.

use reelshelf_common::Result;
use reelshelf_db::models::VideoRecord;
use serde::Deserialize;

use crate::store::RecordStore;

/// Optional restrictions applied to a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VideoFilter {
    /// Case-insensitive substring matched against filename, title and director.
    pub search: Option<String>,
    /// Keep only records with this availability.
    pub available: Option<bool>,
}

impl VideoFilter {
    /// Parse the `filter_available` query value. Anything other than `true` or
    /// `false` means no availability filter.
    pub fn parse_available(value: Option<&str>) -> Option<bool> {
        match value.map(str::trim) {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }

    /// Lowercased search term, `None` when blank.
    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, record: &VideoRecord) -> bool {
        if let Some(available) = self.available {
            if record.is_available != available {
                return false;
            }
        }

        match self.needle() {
            Some(needle) => [
                Some(record.filename.as_str()),
                record.title.as_deref(),
                record.director.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle)),
            None => true,
        }
    }
}

/// Every record in store order that passes `filter`.
pub fn list_videos(store: &dyn RecordStore, filter: &VideoFilter) -> Result<Vec<VideoRecord>> {
    let records = store.scan_all()?;
    Ok(filter_videos(records, filter))
}

/// Apply `filter` to already loaded records, preserving their order.
pub fn filter_videos(records: Vec<VideoRecord>, filter: &VideoFilter) -> Vec<VideoRecord> {
    records.into_iter().filter(|r| filter.matches(r)).collect()
}
