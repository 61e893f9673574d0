//! Download path validation.
//!
//! Maps a requested filename to the on-disk path of an available record. The
//! only side effect is flipping a record to unavailable when its file has
//! vanished since the last sync.

use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use thiserror::Error;
use tracing::{error, warn};

use crate::store::RecordStore;

/// Why a download request cannot be served.
#[derive(Debug, Error)]
pub enum DownloadRejection {
    #[error("filename is required")]
    MissingFilename,

    #[error("invalid filename")]
    Traversal,

    #[error("video not found")]
    NotFound,

    #[error("video is not available")]
    Unavailable,

    #[error("video file is no longer on disk")]
    GoneFromDisk,

    #[error("record store error: {0}")]
    Store(#[from] reelshelf_common::Error),
}

impl DownloadRejection {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFilename | Self::Traversal => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::Unavailable | Self::GoneFromDisk => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Resolve `filename` to a readable path.
///
/// Traversal attempts are rejected before the store is consulted.
pub async fn resolve_download(
    store: &dyn RecordStore,
    filename: &str,
) -> Result<PathBuf, DownloadRejection> {
    if filename.is_empty() {
        return Err(DownloadRejection::MissingFilename);
    }
    if filename.contains("..") {
        warn!(filename, "rejected download with path traversal");
        return Err(DownloadRejection::Traversal);
    }

    let record = store.get(filename)?.ok_or(DownloadRejection::NotFound)?;

    let path = match (record.is_available, record.filepath) {
        (true, Some(path)) => PathBuf::from(path),
        _ => return Err(DownloadRejection::Unavailable),
    };

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        _ => Err(mark_vanished(store, filename, &path)),
    }
}

/// Flip the record for a file that is no longer on disk to unavailable.
///
/// Store failures are logged; the request is rejected either way.
pub fn mark_vanished(store: &dyn RecordStore, filename: &str, path: &Path) -> DownloadRejection {
    warn!(filename, path = %path.display(), "file vanished since last sync, marking unavailable");
    if let Err(e) = store.set_unavailable(filename) {
        error!(filename, error = %e, "failed to mark vanished video unavailable");
    }
    DownloadRejection::GoneFromDisk
}
