//! Internal Rust models matching the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalogued video file, one per filename.
///
/// `filepath` is `None` whenever `is_available` is false; the schema enforces
/// this with a CHECK constraint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoRecord {
    pub id: i64,
    pub filename: String,
    pub filepath: Option<String>,
    pub is_available: bool,

    pub size_bytes: Option<i64>,
    pub duration_seconds: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub codec_name: Option<String>,
    pub bit_rate: Option<i64>,
    pub avg_frame_rate: Option<String>,
    pub display_aspect_ratio: Option<String>,

    pub title: Option<String>,
    pub release_year: Option<i32>,
    pub director: Option<String>,
    pub overview: Option<String>,
    pub cover_image_url: Option<String>,
    pub external_movie_id: Option<String>,
    pub external_alt_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Write model for a file that is present on disk.
///
/// Every optional field is merged with the stored row on update: `None` keeps
/// whatever is already stored. `title`/`release_year` carry the lookup result
/// while `parsed_title`/`parsed_year` are the filename fallback, used only when
/// neither the lookup nor the stored row has a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoUpsert {
    pub filename: String,
    pub filepath: String,

    pub size_bytes: Option<i64>,
    pub duration_seconds: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub codec_name: Option<String>,
    pub bit_rate: Option<i64>,
    pub avg_frame_rate: Option<String>,
    pub display_aspect_ratio: Option<String>,

    pub title: Option<String>,
    pub release_year: Option<i32>,
    pub parsed_title: Option<String>,
    pub parsed_year: Option<i32>,
    pub director: Option<String>,
    pub overview: Option<String>,
    pub cover_image_url: Option<String>,
    pub external_movie_id: Option<String>,
    pub external_alt_id: Option<String>,
}

/// What an upsert did to the row keyed by the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "id", rename_all = "lowercase")]
pub enum UpsertOutcome {
    /// No row existed; one was created.
    Inserted(i64),
    /// The row existed and at least one column changed.
    Updated(i64),
    /// The row existed and the merged values equal the stored ones.
    Unchanged(i64),
}

impl UpsertOutcome {
    /// Row id of the affected record.
    pub fn id(&self) -> i64 {
        match *self {
            Self::Inserted(id) | Self::Updated(id) | Self::Unchanged(id) => id,
        }
    }
}
