//! Video listing and download routes.

use std::io::SeekFrom;
use std::path::Path as FsPath;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use reelshelf_db::models::VideoRecord;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

use super::AppContext;
use crate::download::{mark_vanished, resolve_download, DownloadRejection};
use crate::store::RecordStore;
use crate::library::{self, VideoFilter};

/// Create video routes.
pub fn video_routes() -> Router<AppContext> {
    Router::new()
        .route("/videos", get(list_videos))
        .route("/videos/:filename/download", get(download_video))
}

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListVideosQuery {
    /// Case-insensitive match on filename, title or director
    pub search: Option<String>,
    /// `true` or `false`; any other value disables the filter
    pub filter_available: Option<String>,
}

/// Catalogued video.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VideoResponse {
    pub id: i64,
    pub filename: String,
    /// Absolute path on disk, absent while unavailable
    pub filepath: Option<String>,
    pub is_available: bool,
    pub size_bytes: Option<i64>,
    pub duration_seconds: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub codec_name: Option<String>,
    pub bit_rate: Option<i64>,
    /// Rational frame rate as reported by ffprobe, e.g. `24000/1001`
    pub avg_frame_rate: Option<String>,
    pub display_aspect_ratio: Option<String>,
    pub title: Option<String>,
    pub release_year: Option<i32>,
    pub director: Option<String>,
    pub overview: Option<String>,
    pub cover_image_url: Option<String>,
    /// TMDB identifier
    pub external_movie_id: Option<String>,
    /// IMDb identifier
    pub external_alt_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<VideoRecord> for VideoResponse {
    fn from(video: VideoRecord) -> Self {
        Self {
            id: video.id,
            filename: video.filename,
            filepath: video.filepath,
            is_available: video.is_available,
            size_bytes: video.size_bytes,
            duration_seconds: video.duration_seconds,
            width: video.width,
            height: video.height,
            codec_name: video.codec_name,
            bit_rate: video.bit_rate,
            avg_frame_rate: video.avg_frame_rate,
            display_aspect_ratio: video.display_aspect_ratio,
            title: video.title,
            release_year: video.release_year,
            director: video.director,
            overview: video.overview,
            cover_image_url: video.cover_image_url,
            external_movie_id: video.external_movie_id,
            external_alt_id: video.external_alt_id,
            created_at: video.created_at.to_rfc3339(),
            updated_at: video.updated_at.to_rfc3339(),
        }
    }
}

/// Error body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for DownloadRejection {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Download failed: {}", self);
        }
        (status, Json(MessageResponse::new(self.to_string()))).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List catalogued videos.
#[utoipa::path(
    get,
    path = "/api/videos",
    tag = "videos",
    params(ListVideosQuery),
    responses(
        (status = 200, description = "Videos ordered by title then filename", body = Vec<VideoResponse>),
        (status = 500, description = "Record store error", body = MessageResponse)
    )
)]
pub async fn list_videos(
    State(ctx): State<AppContext>,
    Query(query): Query<ListVideosQuery>,
) -> impl IntoResponse {
    let filter = VideoFilter {
        search: query.search,
        available: VideoFilter::parse_available(query.filter_available.as_deref()),
    };

    match library::list_videos(ctx.store.as_ref(), &filter) {
        Ok(videos) => {
            let videos: Vec<VideoResponse> = videos.into_iter().map(VideoResponse::from).collect();
            Json(videos).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to list videos: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse::new("failed to list videos")),
            )
                .into_response()
        }
    }
}

/// Download a video file, with HTTP range support.
#[utoipa::path(
    get,
    path = "/api/videos/{filename}/download",
    tag = "videos",
    params(
        ("filename" = String, Path, description = "Filename as catalogued")
    ),
    responses(
        (status = 200, description = "Whole file as an attachment"),
        (status = 206, description = "Requested byte range"),
        (status = 400, description = "Missing or invalid filename", body = MessageResponse),
        (status = 404, description = "Unknown, unavailable, or vanished video", body = MessageResponse),
        (status = 500, description = "Record store error", body = MessageResponse)
    )
)]
pub async fn download_video(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Response {
    let path = match resolve_download(ctx.store.as_ref(), &filename).await {
        Ok(path) => path,
        Err(rejection) => return rejection.into_response(),
    };

    serve_resolved(ctx.store.as_ref(), &filename, &path, &headers).await
}

/// Stream a resolved path, retiring the record if the file is gone by now.
async fn serve_resolved(
    store: &dyn RecordStore,
    filename: &str,
    path: &FsPath,
    headers: &HeaderMap,
) -> Response {
    match serve_file(path, headers).await {
        Ok(response) => response,
        Err(StatusCode::NOT_FOUND) => mark_vanished(store, filename, path).into_response(),
        Err(status) => (
            status,
            Json(MessageResponse::new(
                status.canonical_reason().unwrap_or("error"),
            )),
        )
            .into_response(),
    }
}

async fn serve_file(path: &FsPath, headers: &HeaderMap) -> Result<Response, StatusCode> {
    let file_size = tokio::fs::metadata(path)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?
        .len();

    let range = headers
        .get(header::RANGE)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| parse_range_header(s, file_size));

    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = determine_content_type(path);
    let disposition = content_disposition(&basename);

    let mut file = File::open(path).await.map_err(|_| StatusCode::NOT_FOUND)?;

    match range {
        Some((start, end)) => {
            let length = end - start + 1;

            file.seek(SeekFrom::Start(start))
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

            let body = Body::from_stream(ReaderStream::new(file.take(length)));

            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_DISPOSITION, disposition)
                .header(header::CONTENT_LENGTH, length.to_string())
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, file_size),
                )
                .header(header::ACCEPT_RANGES, "bytes")
                .body(body)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
        }
        None => {
            let body = Body::from_stream(ReaderStream::new(file));

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_DISPOSITION, disposition)
                .header(header::CONTENT_LENGTH, file_size.to_string())
                .header(header::ACCEPT_RANGES, "bytes")
                .body(body)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Parse HTTP Range header.
///
/// Supports formats:
/// - bytes=0-499
/// - bytes=500-
/// - bytes=-500 (last 500 bytes)
///
/// Multiple ranges and unsatisfiable ranges yield `None`, and the whole file
/// is served instead.
fn parse_range_header(header: &str, file_size: u64) -> Option<(u64, u64)> {
    if file_size == 0 {
        return None;
    }
    let header = header.trim().strip_prefix("bytes=")?;

    let (start, end) = header.split_once('-')?;
    let start = start.trim();
    let end = end.trim();

    match (start.is_empty(), end.is_empty()) {
        (true, false) => {
            let suffix_len: u64 = end.parse().ok()?;
            if suffix_len == 0 {
                return None;
            }
            Some((file_size.saturating_sub(suffix_len), file_size - 1))
        }
        (false, true) => {
            let start: u64 = start.parse().ok()?;
            if start >= file_size {
                return None;
            }
            Some((start, file_size - 1))
        }
        (false, false) => {
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            if start >= file_size {
                return None;
            }
            let end = end.min(file_size - 1);
            if start > end {
                return None;
            }
            Some((start, end))
        }
        (true, true) => None,
    }
}

/// Content type from the file extension.
fn determine_content_type(path: &FsPath) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "ts" | "m2ts" => "video/mp2t",
        _ => "application/octet-stream",
    }
}

fn content_disposition(basename: &str) -> String {
    let escaped: String = basename
        .chars()
        .filter(|c| !c.is_control())
        .flat_map(|c| match c {
            '"' | '\\' => vec!['\\', c],
            _ => vec![c],
        })
        .collect();
    format!("attachment; filename=\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use reelshelf_db::{models::VideoUpsert, pool::init_memory_pool};

    #[tokio::test]
    async fn test_file_removed_after_resolve_is_marked_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"data").unwrap();

        let store = SqliteStore::new(init_memory_pool().unwrap());
        store
            .upsert(&VideoUpsert {
                filename: "clip.mp4".to_string(),
                filepath: path.to_string_lossy().into_owned(),
                ..Default::default()
            })
            .unwrap();

        let resolved = resolve_download(&store, "clip.mp4").await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let response = serve_resolved(&store, "clip.mp4", &resolved, &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let record = store.get("clip.mp4").unwrap().unwrap();
        assert!(!record.is_available);
        assert_eq!(record.filepath, None);
    }

    #[tokio::test]
    async fn test_serve_resolved_streams_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"data").unwrap();

        let store = SqliteStore::new(init_memory_pool().unwrap());
        let response = serve_resolved(&store, "clip.mp4", &path, &HeaderMap::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
    }

    #[test]
    fn test_parse_range_header_full_range() {
        assert_eq!(parse_range_header("bytes=0-499", 1000), Some((0, 499)));
    }

    #[test]
    fn test_parse_range_header_open_end() {
        assert_eq!(parse_range_header("bytes=500-", 1000), Some((500, 999)));
    }

    #[test]
    fn test_parse_range_header_suffix() {
        assert_eq!(parse_range_header("bytes=-200", 1000), Some((800, 999)));
        assert_eq!(parse_range_header("bytes=-5000", 1000), Some((0, 999)));
    }

    #[test]
    fn test_parse_range_header_clamped() {
        assert_eq!(parse_range_header("bytes=0-2000", 1000), Some((0, 999)));
    }

    #[test]
    fn test_parse_range_header_invalid() {
        assert_eq!(parse_range_header("bytes=1500-", 1000), None);
        assert_eq!(parse_range_header("bytes=-", 1000), None);
        assert_eq!(parse_range_header("bytes=abc-def", 1000), None);
        assert_eq!(parse_range_header("bytes=0-1,5-9", 1000), None);
        assert_eq!(parse_range_header("items=0-1", 1000), None);
        assert_eq!(parse_range_header("bytes=0-10", 0), None);
    }

    #[test]
    fn test_determine_content_type() {
        assert_eq!(determine_content_type(FsPath::new("a.mp4")), "video/mp4");
        assert_eq!(determine_content_type(FsPath::new("a.MKV")), "video/x-matroska");
        assert_eq!(determine_content_type(FsPath::new("a.webm")), "video/webm");
        assert_eq!(determine_content_type(FsPath::new("a.mov")), "video/quicktime");
        assert_eq!(
            determine_content_type(FsPath::new("noext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("The Matrix (1999).mkv"),
            "attachment; filename=\"The Matrix (1999).mkv\""
        );
        assert_eq!(
            content_disposition("a\"b.mp4"),
            "attachment; filename=\"a\\\"b.mp4\""
        );
    }
}
