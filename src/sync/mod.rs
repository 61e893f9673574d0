//! Library reconciliation.
//!
//! One pass lists the eligible files of the video directory, enriches every
//! file with technical metadata (probe) and descriptive metadata (lookup),
//! upserts the merged record, and finally retires records whose file is gone.
//!
//! Enrichment is failure-tolerant per file: a failed probe or lookup degrades
//! the record instead of dropping it, and a failed upsert only counts against
//! that file. Only configuration problems, an unreadable directory, or a failed
//! initial scan of the store abort the pass.

pub mod coordinator;

pub use coordinator::{SyncAlreadyRunning, SyncCoordinator, SyncPermit, SyncStatus};

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use reelshelf_common::paths::{has_allowed_extension, normalize_extension};
use reelshelf_db::models::{UpsertOutcome, VideoUpsert};
use reelshelf_parser::ParsedFilename;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use walkdir::WalkDir;

use crate::config::Config;
use crate::metadata::{lookup_movie, providers::TmdbProvider, DescriptiveMetadata, MetadataProvider};
use crate::probe::{FfprobeProber, Prober, TechnicalMetadata};
use crate::store::RecordStore;

/// Everything a pass needs to know, fixed at engine construction.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Directory to reconcile. `None` makes every pass fail with
    /// [`SyncError::NotConfigured`].
    pub video_directory: Option<PathBuf>,
    /// Lowercase extensions without the dot.
    pub allowed_extensions: BTreeSet<String>,
    pub lookup_timeout: Duration,
    /// Lookups are skipped when unset.
    pub lookup_api_key: Option<String>,
    pub lookup_language: String,
    pub lookup_base_url: String,
    pub probe_timeout: Duration,
    /// Files enriched in parallel.
    pub concurrency: usize,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            video_directory: config.library.video_directory.clone(),
            allowed_extensions: config
                .library
                .allowed_extensions
                .iter()
                .filter_map(|ext| normalize_extension(ext))
                .collect(),
            lookup_timeout: Duration::from_secs(config.metadata.lookup_timeout_secs),
            lookup_api_key: config
                .metadata
                .tmdb_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            lookup_language: config.metadata.language.clone(),
            lookup_base_url: config.metadata.tmdb_base_url.clone(),
            probe_timeout: Duration::from_secs(config.metadata.probe_timeout_secs),
            concurrency: config.sync.concurrency.max(1),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Pass-level failures. Per-file problems never surface here.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("video directory is not configured")]
    NotConfigured,

    #[error("failed to read video directory {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory listing task failed: {0}")]
    Listing(#[from] tokio::task::JoinError),

    #[error("record store error: {0}")]
    Store(#[from] reelshelf_common::Error),
}

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SyncReport {
    /// Eligible files found on disk.
    pub files_found: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Records marked unavailable because their file is gone.
    pub retired: usize,
    /// Upserts or retirements that hit a store error.
    pub failed: usize,
    /// The configured directory did not exist; nothing was changed.
    pub directory_missing: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    /// Files whose record was written or confirmed this pass.
    pub fn processed(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }

    fn record(&mut self, outcome: &UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted(_) => self.inserted += 1,
            UpsertOutcome::Updated(_) => self.updated += 1,
            UpsertOutcome::Unchanged(_) => self.unchanged += 1,
        }
    }
}

/// An eligible file in the video directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskFile {
    pub filename: String,
    pub path: PathBuf,
}

/// Reconciles the video directory with the record store.
pub struct SyncEngine {
    settings: SyncSettings,
    store: Arc<dyn RecordStore>,
    prober: Arc<dyn Prober>,
    provider: Arc<dyn MetadataProvider>,
}

impl SyncEngine {
    pub fn new(
        settings: SyncSettings,
        store: Arc<dyn RecordStore>,
        prober: Arc<dyn Prober>,
        provider: Arc<dyn MetadataProvider>,
    ) -> Self {
        Self {
            settings,
            store,
            prober,
            provider,
        }
    }

    /// Engine wired to ffprobe and TMDB.
    pub fn with_defaults(settings: SyncSettings, store: Arc<dyn RecordStore>) -> anyhow::Result<Self> {
        let provider = TmdbProvider::with_base_url(
            settings.lookup_api_key.clone().unwrap_or_default(),
            settings.lookup_language.clone(),
            settings.lookup_base_url.clone(),
        )?;
        Ok(Self::new(
            settings,
            store,
            Arc::new(FfprobeProber::new()),
            Arc::new(provider),
        ))
    }

    /// Run one full reconciliation pass.
    pub async fn synchronize(&self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        let dir = self
            .settings
            .video_directory
            .as_deref()
            .ok_or(SyncError::NotConfigured)?;

        info!(directory = %dir.display(), "starting library sync");

        let listing = {
            let dir = dir.to_path_buf();
            let allowed = self.settings.allowed_extensions.clone();
            tokio::task::spawn_blocking(move || list_eligible_files(&dir, &allowed)).await??
        };
        let files = match listing {
            Some(files) => files,
            None => {
                warn!(directory = %dir.display(), "video directory not found, skipping sync");
                report.directory_missing = true;
                report.finished_at = Some(Utc::now());
                return Ok(report);
            }
        };
        report.files_found = files.len();

        let known = self.store.scan_all()?;
        debug!(
            on_disk = files.len(),
            in_store = known.len(),
            "diffing directory against store"
        );

        if self.settings.lookup_api_key.is_none() {
            info!("no lookup API key configured, descriptive metadata will not be fetched");
        }

        let outcomes: Vec<(String, reelshelf_common::Result<UpsertOutcome>)> =
            stream::iter(files.clone())
                .map(|file| async move {
                    let outcome = self.process_file(&file).await;
                    (file.filename, outcome)
                })
                .buffer_unordered(self.settings.concurrency.max(1))
                .collect()
                .await;

        for (filename, outcome) in outcomes {
            match outcome {
                Ok(outcome) => {
                    info!(filename = %filename, ?outcome, "video synced");
                    report.record(&outcome);
                }
                Err(e) => {
                    error!(filename = %filename, error = %e, "failed to store video record");
                    report.failed += 1;
                }
            }
        }

        let on_disk: HashSet<&str> = files.iter().map(|f| f.filename.as_str()).collect();
        for record in known
            .iter()
            .filter(|r| r.is_available && !on_disk.contains(r.filename.as_str()))
        {
            match self.store.set_unavailable(&record.filename) {
                Ok(true) => {
                    info!(filename = %record.filename, "video no longer on disk, marked unavailable");
                    report.retired += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(filename = %record.filename, error = %e, "failed to mark video unavailable");
                    report.failed += 1;
                }
            }
        }

        report.finished_at = Some(Utc::now());
        info!(
            files_found = report.files_found,
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            retired = report.retired,
            failed = report.failed,
            "library sync finished"
        );

        Ok(report)
    }

    async fn process_file(&self, file: &DiskFile) -> reelshelf_common::Result<UpsertOutcome> {
        let technical = self.probe(file).await;
        let parsed = reelshelf_parser::parse(&file.filename);
        debug!(
            filename = %file.filename,
            title = ?parsed.title,
            year = ?parsed.year,
            "parsed filename"
        );

        let descriptive = match (&parsed.title, &self.settings.lookup_api_key) {
            (Some(title), Some(_)) => self.lookup(&file.filename, title, parsed.year).await,
            _ => None,
        };

        let upsert = merge_sources(file, technical, descriptive, &parsed);
        self.store.upsert(&upsert)
    }

    async fn probe(&self, file: &DiskFile) -> TechnicalMetadata {
        let result = tokio::time::timeout(self.settings.probe_timeout, self.prober.probe(&file.path)).await;

        let mut technical = match result {
            Ok(Ok(meta)) => {
                if meta.is_degraded() {
                    debug!(filename = %file.filename, "probe found no video stream");
                }
                meta
            }
            Ok(Err(e)) => {
                warn!(filename = %file.filename, error = %e, "probe failed, storing size only");
                TechnicalMetadata::default()
            }
            Err(_) => {
                warn!(
                    filename = %file.filename,
                    timeout_secs = self.settings.probe_timeout.as_secs_f64(),
                    "probe timed out, storing size only"
                );
                TechnicalMetadata::default()
            }
        };

        if technical.size_bytes.is_none() {
            technical.size_bytes = tokio::fs::metadata(&file.path)
                .await
                .ok()
                .and_then(|m| i64::try_from(m.len()).ok());
        }
        technical
    }

    async fn lookup(&self, filename: &str, title: &str, year: Option<u16>) -> Option<DescriptiveMetadata> {
        let result = tokio::time::timeout(
            self.settings.lookup_timeout,
            lookup_movie(self.provider.as_ref(), title, year),
        )
        .await;

        match result {
            Ok(Ok(Some(meta))) => Some(meta),
            Ok(Ok(None)) => {
                debug!(filename, title, "no lookup match");
                None
            }
            Ok(Err(e)) => {
                warn!(filename, error = %e, "metadata lookup failed, using parsed title");
                None
            }
            Err(_) => {
                warn!(filename, "metadata lookup timed out, using parsed title");
                None
            }
        }
    }
}

/// List the eligible files of `dir`, sorted by filename.
///
/// Returns `Ok(None)` when the directory does not exist.
pub fn list_eligible_files(
    dir: &Path,
    allowed_extensions: &BTreeSet<String>,
) -> Result<Option<Vec<DiskFile>>, SyncError> {
    let unreadable = |source: std::io::Error| SyncError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(unreadable(std::io::Error::new(
                std::io::ErrorKind::Other,
                "not a directory",
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(unreadable(e)),
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(unreadable(e.into())),
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() || !has_allowed_extension(entry.path(), allowed_extensions) {
            continue;
        }

        let Some(filename) = entry.file_name().to_str() else {
            warn!(path = ?entry.path(), "skipping file with non UTF-8 name");
            continue;
        };

        files.push(DiskFile {
            filename: filename.to_string(),
            path: entry.path().to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(Some(files))
}

/// Merge the two optional metadata sources into one upsert.
///
/// Title and year come from the lookup when it produced them; the parsed
/// values are carried separately as the fallback.
pub fn merge_sources(
    file: &DiskFile,
    technical: TechnicalMetadata,
    descriptive: Option<DescriptiveMetadata>,
    parsed: &ParsedFilename,
) -> VideoUpsert {
    let descriptive = descriptive.unwrap_or_default();

    VideoUpsert {
        filename: file.filename.clone(),
        filepath: file.path.to_string_lossy().into_owned(),

        size_bytes: technical.size_bytes,
        duration_seconds: technical.duration_seconds,
        width: technical.width,
        height: technical.height,
        codec_name: technical.codec_name,
        bit_rate: technical.bit_rate,
        avg_frame_rate: technical.avg_frame_rate,
        display_aspect_ratio: technical.display_aspect_ratio,

        title: descriptive.title,
        release_year: descriptive.release_year.map(i32::from),
        parsed_title: parsed.title.clone(),
        parsed_year: parsed.year.map(i32::from),
        director: descriptive.director,
        overview: descriptive.overview,
        cover_image_url: descriptive.cover_image_url,
        external_movie_id: descriptive.external_movie_id,
        external_alt_id: descriptive.external_alt_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extensions() -> BTreeSet<String> {
        reelshelf_common::paths::default_video_extensions()
    }

    #[test]
    fn test_list_eligible_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.MKV"), b"x").unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("noext"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested.mp4")).unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("deep.mp4"), b"x").unwrap();

        let files = list_eligible_files(dir.path(), &extensions()).unwrap().unwrap();
        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.mp4", "b.MKV"]);
        assert_eq!(files[0].path, dir.path().join("a.mp4"));
    }

    #[test]
    fn test_list_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        assert!(list_eligible_files(&missing, &extensions()).unwrap().is_none());
    }

    #[test]
    fn test_list_file_instead_of_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.mp4");
        std::fs::write(&file, b"x").unwrap();
        let result = list_eligible_files(&file, &extensions());
        assert!(matches!(result, Err(SyncError::DirectoryUnreadable { .. })));
    }

    #[test]
    fn test_merge_with_lookup() {
        let file = DiskFile {
            filename: "The.Matrix.1999.mkv".to_string(),
            path: PathBuf::from("/videos/The.Matrix.1999.mkv"),
        };
        let technical = TechnicalMetadata {
            size_bytes: Some(100),
            width: Some(1920),
            ..Default::default()
        };
        let descriptive = DescriptiveMetadata {
            title: Some("The Matrix".to_string()),
            release_year: Some(1999),
            director: Some("Lana Wachowski".to_string()),
            external_movie_id: Some("603".to_string()),
            ..Default::default()
        };
        let parsed = reelshelf_parser::parse_with_reference_year(&file.filename, 2024);

        let upsert = merge_sources(&file, technical, Some(descriptive), &parsed);
        assert_eq!(upsert.filepath, "/videos/The.Matrix.1999.mkv");
        assert_eq!(upsert.size_bytes, Some(100));
        assert_eq!(upsert.width, Some(1920));
        assert_eq!(upsert.title.as_deref(), Some("The Matrix"));
        assert_eq!(upsert.release_year, Some(1999));
        assert_eq!(upsert.parsed_title.as_deref(), Some("The Matrix"));
        assert_eq!(upsert.director.as_deref(), Some("Lana Wachowski"));
    }

    #[test]
    fn test_merge_without_lookup() {
        let file = DiskFile {
            filename: "Alien (1979).mkv".to_string(),
            path: PathBuf::from("/videos/Alien (1979).mkv"),
        };
        let parsed = reelshelf_parser::parse_with_reference_year(&file.filename, 2024);

        let upsert = merge_sources(&file, TechnicalMetadata::size_only(Some(5)), None, &parsed);
        assert_eq!(upsert.title, None);
        assert_eq!(upsert.release_year, None);
        assert_eq!(upsert.parsed_title.as_deref(), Some("Alien"));
        assert_eq!(upsert.parsed_year, Some(1979));
        assert_eq!(upsert.size_bytes, Some(5));
        assert_eq!(upsert.director, None);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.library.allowed_extensions = vec![".MP4".to_string(), "".to_string(), "mkv".to_string()];
        config.metadata.tmdb_api_key = Some("  ".to_string());
        config.sync.concurrency = 0;

        let settings = SyncSettings::from_config(&config);
        assert_eq!(
            settings.allowed_extensions.into_iter().collect::<Vec<_>>(),
            vec!["mkv", "mp4"]
        );
        assert_eq!(settings.lookup_api_key, None);
        assert_eq!(settings.concurrency, 1);
        assert_eq!(settings.lookup_timeout, Duration::from_secs(5));
        assert_eq!(settings.probe_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_report_processed() {
        let report = SyncReport {
            inserted: 2,
            updated: 1,
            unchanged: 4,
            failed: 3,
            ..Default::default()
        };
        assert_eq!(report.processed(), 7);
    }
}
