//! Video record query operations.
//!
//! The `videos` table is keyed by filename. Rows are inserted or merged by
//! [`upsert_video`], soft-deleted by [`set_unavailable`], and never removed.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use reelshelf_common::{Error, Result};

use crate::models::{UpsertOutcome, VideoRecord, VideoUpsert};

const VIDEO_COLUMNS: &str = "id, filename, filepath, is_available,
    size_bytes, duration_seconds, width, height, codec_name, bit_rate,
    avg_frame_rate, display_aspect_ratio,
    title, release_year, director, overview, cover_image_url,
    external_movie_id, external_alt_id,
    created_at, updated_at";

/// Insert a video or merge it into the existing row with the same filename.
///
/// On conflict every metadata column becomes `COALESCE(new, stored)`, title
/// and year prefer the lookup value, then the stored value, then the parsed
/// fallback. The row is only rewritten (and `updated_at` only bumped) when the
/// merged values differ from what is stored.
///
/// # Returns
///
/// * `Ok(UpsertOutcome)` - Whether the row was inserted, updated, or left as is
/// * `Err(Error)` - If a database error occurs
pub fn upsert_video(conn: &Connection, video: &VideoUpsert) -> Result<UpsertOutcome> {
    // Take the write lock up front so a busy writer is waited on.
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| Error::database(e.to_string()))?;

    let existing_id: Option<i64> = tx
        .query_row(
            "SELECT id FROM videos WHERE filename = :filename",
            rusqlite::named_params! { ":filename": &video.filename },
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::database(e.to_string()))?;

    let now = Utc::now().to_rfc3339();

    let affected = tx
        .execute(
            "INSERT INTO videos (
                filename, filepath, is_available,
                size_bytes, duration_seconds, width, height, codec_name, bit_rate,
                avg_frame_rate, display_aspect_ratio,
                title, release_year, director, overview, cover_image_url,
                external_movie_id, external_alt_id,
                created_at, updated_at
             ) VALUES (
                :filename, :filepath, 1,
                :size_bytes, :duration_seconds, :width, :height, :codec_name, :bit_rate,
                :avg_frame_rate, :display_aspect_ratio,
                COALESCE(:title, :parsed_title), COALESCE(:release_year, :parsed_year),
                :director, :overview, :cover_image_url,
                :external_movie_id, :external_alt_id,
                :now, :now
             )
             ON CONFLICT(filename) DO UPDATE SET
                filepath = excluded.filepath,
                is_available = 1,
                size_bytes = COALESCE(excluded.size_bytes, videos.size_bytes),
                duration_seconds = COALESCE(excluded.duration_seconds, videos.duration_seconds),
                width = COALESCE(excluded.width, videos.width),
                height = COALESCE(excluded.height, videos.height),
                codec_name = COALESCE(excluded.codec_name, videos.codec_name),
                bit_rate = COALESCE(excluded.bit_rate, videos.bit_rate),
                avg_frame_rate = COALESCE(excluded.avg_frame_rate, videos.avg_frame_rate),
                display_aspect_ratio = COALESCE(excluded.display_aspect_ratio, videos.display_aspect_ratio),
                title = COALESCE(:title, videos.title, :parsed_title),
                release_year = COALESCE(:release_year, videos.release_year, :parsed_year),
                director = COALESCE(excluded.director, videos.director),
                overview = COALESCE(excluded.overview, videos.overview),
                cover_image_url = COALESCE(excluded.cover_image_url, videos.cover_image_url),
                external_movie_id = COALESCE(excluded.external_movie_id, videos.external_movie_id),
                external_alt_id = COALESCE(excluded.external_alt_id, videos.external_alt_id),
                updated_at = excluded.updated_at
             WHERE videos.filepath IS NOT excluded.filepath
                OR videos.is_available = 0
                OR COALESCE(excluded.size_bytes, videos.size_bytes) IS NOT videos.size_bytes
                OR COALESCE(excluded.duration_seconds, videos.duration_seconds) IS NOT videos.duration_seconds
                OR COALESCE(excluded.width, videos.width) IS NOT videos.width
                OR COALESCE(excluded.height, videos.height) IS NOT videos.height
                OR COALESCE(excluded.codec_name, videos.codec_name) IS NOT videos.codec_name
                OR COALESCE(excluded.bit_rate, videos.bit_rate) IS NOT videos.bit_rate
                OR COALESCE(excluded.avg_frame_rate, videos.avg_frame_rate) IS NOT videos.avg_frame_rate
                OR COALESCE(excluded.display_aspect_ratio, videos.display_aspect_ratio) IS NOT videos.display_aspect_ratio
                OR COALESCE(:title, videos.title, :parsed_title) IS NOT videos.title
                OR COALESCE(:release_year, videos.release_year, :parsed_year) IS NOT videos.release_year
                OR COALESCE(excluded.director, videos.director) IS NOT videos.director
                OR COALESCE(excluded.overview, videos.overview) IS NOT videos.overview
                OR COALESCE(excluded.cover_image_url, videos.cover_image_url) IS NOT videos.cover_image_url
                OR COALESCE(excluded.external_movie_id, videos.external_movie_id) IS NOT videos.external_movie_id
                OR COALESCE(excluded.external_alt_id, videos.external_alt_id) IS NOT videos.external_alt_id",
            rusqlite::named_params! {
                ":filename": &video.filename,
                ":filepath": &video.filepath,
                ":size_bytes": video.size_bytes,
                ":duration_seconds": video.duration_seconds,
                ":width": video.width,
                ":height": video.height,
                ":codec_name": &video.codec_name,
                ":bit_rate": video.bit_rate,
                ":avg_frame_rate": &video.avg_frame_rate,
                ":display_aspect_ratio": &video.display_aspect_ratio,
                ":title": &video.title,
                ":release_year": video.release_year,
                ":parsed_title": &video.parsed_title,
                ":parsed_year": video.parsed_year,
                ":director": &video.director,
                ":overview": &video.overview,
                ":cover_image_url": &video.cover_image_url,
                ":external_movie_id": &video.external_movie_id,
                ":external_alt_id": &video.external_alt_id,
                ":now": now,
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    let outcome = match existing_id {
        None => UpsertOutcome::Inserted(tx.last_insert_rowid()),
        Some(id) if affected > 0 => UpsertOutcome::Updated(id),
        Some(id) => UpsertOutcome::Unchanged(id),
    };

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    Ok(outcome)
}

/// Parse a video from a database row selected with [`VIDEO_COLUMNS`].
fn parse_video_row(row: &rusqlite::Row) -> rusqlite::Result<VideoRecord> {
    Ok(VideoRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        filepath: row.get(2)?,
        is_available: row.get::<_, i32>(3)? != 0,
        size_bytes: row.get(4)?,
        duration_seconds: row.get(5)?,
        width: row.get(6)?,
        height: row.get(7)?,
        codec_name: row.get(8)?,
        bit_rate: row.get(9)?,
        avg_frame_rate: row.get(10)?,
        display_aspect_ratio: row.get(11)?,
        title: row.get(12)?,
        release_year: row.get(13)?,
        director: row.get(14)?,
        overview: row.get(15)?,
        cover_image_url: row.get(16)?,
        external_movie_id: row.get(17)?,
        external_alt_id: row.get(18)?,
        created_at: parse_timestamp(row, 19)?,
        updated_at: parse_timestamp(row, 20)?,
    })
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Get a video by its filename.
///
/// # Returns
///
/// * `Ok(Some(VideoRecord))` - The video if found
/// * `Ok(None)` - If no row has this filename
/// * `Err(Error)` - If a database error occurs
pub fn get_video_by_filename(conn: &Connection, filename: &str) -> Result<Option<VideoRecord>> {
    let result = conn.query_row(
        &format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE filename = :filename"),
        rusqlite::named_params! { ":filename": filename },
        parse_video_row,
    );

    match result {
        Ok(video) => Ok(Some(video)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List every video, ordered by title then filename (rows without a title
/// sort first).
pub fn list_videos(conn: &Connection) -> Result<Vec<VideoRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos ORDER BY title, filename"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let videos = stmt
        .query_map([], parse_video_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(videos)
}

/// Mark a video unavailable and clear its path.
///
/// Returns `true` if the row changed, `false` if it was already unavailable
/// or does not exist.
pub fn set_unavailable(conn: &Connection, filename: &str) -> Result<bool> {
    let affected = conn
        .execute(
            "UPDATE videos SET is_available = 0, filepath = NULL, updated_at = :now
             WHERE filename = :filename AND (is_available = 1 OR filepath IS NOT NULL)",
            rusqlite::named_params! {
                ":filename": filename,
                ":now": Utc::now().to_rfc3339(),
            },
        )
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(affected > 0)
}
