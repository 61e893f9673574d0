//! Record store seam.
//!
//! The reconciliation engine, the listing layer and the download validator only
//! see [`RecordStore`]. [`SqliteStore`] implements it on top of the pooled
//! SQLite database from `reelshelf-db`.

use reelshelf_common::Result;
use reelshelf_db::{
    models::{UpsertOutcome, VideoRecord, VideoUpsert},
    pool::{get_conn, DbPool},
    queries::videos,
};

/// Durable storage of video records keyed by filename.
pub trait RecordStore: Send + Sync {
    /// Insert or merge the record for `upsert.filename`.
    fn upsert(&self, upsert: &VideoUpsert) -> Result<UpsertOutcome>;

    /// Every record, ordered by title then filename.
    fn scan_all(&self) -> Result<Vec<VideoRecord>>;

    /// The record for `filename`, if any.
    fn get(&self, filename: &str) -> Result<Option<VideoRecord>>;

    /// Mark `filename` unavailable and clear its path.
    ///
    /// Returns `false` when the record does not exist or is already unavailable.
    fn set_unavailable(&self, filename: &str) -> Result<bool>;
}

/// [`RecordStore`] backed by an r2d2 SQLite pool.
///
/// Each call checks out one connection and returns it before finishing, which
/// keeps the single-connection in-memory pool usable.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl RecordStore for SqliteStore {
    fn upsert(&self, upsert: &VideoUpsert) -> Result<UpsertOutcome> {
        let conn = get_conn(&self.pool)?;
        videos::upsert_video(&conn, upsert)
    }

    fn scan_all(&self) -> Result<Vec<VideoRecord>> {
        let conn = get_conn(&self.pool)?;
        videos::list_videos(&conn)
    }

    fn get(&self, filename: &str) -> Result<Option<VideoRecord>> {
        let conn = get_conn(&self.pool)?;
        videos::get_video_by_filename(&conn, filename)
    }

    fn set_unavailable(&self, filename: &str) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        videos::set_unavailable(&conn, filename)
    }
}
