//! Shared test harness for integration tests.
//!
//! Provides [`TestLibrary`], a temporary video directory paired with an
//! in-memory record store, plus scriptable [`FakeProber`] and [`FakeProvider`]
//! doubles so sync passes run without ffprobe or network access.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use reelshelf::config::Config;
use reelshelf::metadata::{MetadataProvider, MovieDetails, SearchResult};
use reelshelf::probe::{Prober, TechnicalMetadata};
use reelshelf::server::AppContext;
use reelshelf::store::{RecordStore, SqliteStore};
use reelshelf::sync::{SyncEngine, SyncSettings};
use reelshelf_common::paths::default_video_extensions;
use reelshelf_db::models::VideoUpsert;
use reelshelf_db::pool::init_memory_pool;

// ---------------------------------------------------------------------------
// Prober double
// ---------------------------------------------------------------------------

/// Prober answering from a table keyed by filename.
///
/// Files without an entry get [`FakeProber::standard`] metadata.
#[derive(Default)]
pub struct FakeProber {
    results: HashMap<String, Result<TechnicalMetadata, String>>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1080p H.264 at 24fps, size left to the engine.
    pub fn standard() -> TechnicalMetadata {
        TechnicalMetadata {
            size_bytes: None,
            duration_seconds: Some(5400.0),
            width: Some(1920),
            height: Some(1080),
            codec_name: Some("h264".to_string()),
            bit_rate: Some(8_000_000),
            avg_frame_rate: Some("24/1".to_string()),
            display_aspect_ratio: Some("16:9".to_string()),
        }
    }

    pub fn with_result(mut self, filename: &str, meta: TechnicalMetadata) -> Self {
        self.results.insert(filename.to_string(), Ok(meta));
        self
    }

    pub fn failing(mut self, filename: &str) -> Self {
        self.results
            .insert(filename.to_string(), Err("invalid data found".to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, path: &Path) -> anyhow::Result<TechnicalMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        match self.results.get(filename) {
            Some(Ok(meta)) => Ok(meta.clone()),
            Some(Err(message)) => Err(anyhow::anyhow!("ffprobe failed: {}", message)),
            None => Ok(Self::standard()),
        }
    }
}

// ---------------------------------------------------------------------------
// Provider double
// ---------------------------------------------------------------------------

/// Movie database keyed by search title.
#[derive(Default)]
pub struct FakeProvider {
    movies: HashMap<String, (SearchResult, MovieDetails)>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    pub searches: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movie(
        mut self,
        query: &str,
        id: &str,
        title: &str,
        year: u16,
        director: &str,
    ) -> Self {
        let result = SearchResult {
            id: id.to_string(),
            title: title.to_string(),
            year: Some(year),
            overview: Some(format!("{} overview", title)),
            confidence: 0.8,
            poster_url: Some(format!("https://image.tmdb.org/t/p/w500/{}.jpg", id)),
        };
        let details = MovieDetails {
            id: id.to_string(),
            title: Some(title.to_string()),
            year: Some(year),
            director: Some(director.to_string()),
            overview: Some(format!("{} overview", title)),
            poster_url: Some(format!("https://image.tmdb.org/t/p/w500/{}.jpg", id)),
            imdb_id: Some(format!("tt{}", id)),
        };
        self.movies.insert(query.to_string(), (result, details));
        self
    }

    /// Searches for `query` fail with a network error.
    pub fn failing(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn search_movie(
        &self,
        title: &str,
        _year: Option<u16>,
    ) -> anyhow::Result<Vec<SearchResult>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(title) {
            anyhow::bail!("connection refused");
        }
        Ok(self
            .movies
            .get(title)
            .map(|(result, _)| vec![result.clone()])
            .unwrap_or_default())
    }

    async fn get_movie_details(&self, provider_id: &str) -> anyhow::Result<MovieDetails> {
        self.movies
            .values()
            .find(|(result, _)| result.id == provider_id)
            .map(|(_, details)| details.clone())
            .ok_or_else(|| anyhow::anyhow!("movie {} not found", provider_id))
    }
}

// ---------------------------------------------------------------------------
// Library harness
// ---------------------------------------------------------------------------

/// A temporary video directory and an in-memory record store.
pub struct TestLibrary {
    pub dir: TempDir,
    pub store: SqliteStore,
}

impl TestLibrary {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let pool = init_memory_pool().expect("failed to create in-memory pool");
        Self {
            dir,
            store: SqliteStore::new(pool),
        }
    }

    pub fn path(&self, filename: &str) -> PathBuf {
        self.dir.path().join(filename)
    }

    /// Write a file into the video directory.
    pub fn add_file(&self, filename: &str, contents: &[u8]) -> PathBuf {
        let path = self.path(filename);
        std::fs::write(&path, contents).expect("failed to write video file");
        path
    }

    pub fn remove_file(&self, filename: &str) {
        std::fs::remove_file(self.path(filename)).expect("failed to remove video file");
    }

    /// Insert a bare available record pointing at `filepath`.
    pub fn seed(&self, filename: &str, filepath: &Path) {
        self.store
            .upsert(&VideoUpsert {
                filename: filename.to_string(),
                filepath: filepath.to_string_lossy().into_owned(),
                ..Default::default()
            })
            .expect("failed to seed record");
    }

    /// Settings pointing at the temp directory with lookups enabled.
    pub fn settings(&self) -> SyncSettings {
        SyncSettings {
            video_directory: Some(self.dir.path().to_path_buf()),
            allowed_extensions: default_video_extensions(),
            lookup_timeout: Duration::from_secs(2),
            lookup_api_key: Some("test".to_string()),
            lookup_language: "en-US".to_string(),
            lookup_base_url: "http://127.0.0.1:9".to_string(),
            probe_timeout: Duration::from_secs(2),
            concurrency: 2,
        }
    }

    pub fn store_handle(&self) -> Arc<dyn RecordStore> {
        Arc::new(self.store.clone())
    }

    pub fn engine(&self, prober: FakeProber, provider: FakeProvider) -> SyncEngine {
        self.engine_with_settings(self.settings(), prober, provider)
    }

    pub fn engine_with_settings(
        &self,
        settings: SyncSettings,
        prober: FakeProber,
        provider: FakeProvider,
    ) -> SyncEngine {
        SyncEngine::new(
            settings,
            self.store_handle(),
            Arc::new(prober),
            Arc::new(provider),
        )
    }

    /// Application context over this library, for router tests.
    pub fn app_context(&self, prober: FakeProber, provider: FakeProvider) -> AppContext {
        let mut config = Config::default();
        config.library.video_directory = Some(self.dir.path().to_path_buf());
        AppContext::new(config, self.store_handle(), self.engine(prober, provider))
    }
}
