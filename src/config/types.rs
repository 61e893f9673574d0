use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Directory whose files make up the library (not searched recursively)
    #[serde(default)]
    pub video_directory: Option<PathBuf>,

    /// Extensions to catalogue, with or without the leading dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// SQLite database file, relative paths resolve against the config file's directory
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_allowed_extensions() -> Vec<String> {
    reelshelf_common::paths::default_video_extensions()
        .into_iter()
        .collect()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("reelshelf.db")
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            video_directory: None,
            allowed_extensions: default_allowed_extensions(),
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataConfig {
    /// TMDB API key. Lookups are skipped when unset.
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    #[serde(default = "default_tmdb_base_url")]
    pub tmdb_base_url: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}
fn default_language() -> String {
    "en-US".to_string()
}
fn default_lookup_timeout() -> u64 {
    5
}
fn default_probe_timeout() -> u64 {
    30
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            tmdb_base_url: default_tmdb_base_url(),
            language: default_language(),
            lookup_timeout_secs: default_lookup_timeout(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Files enriched in parallel during a pass
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Run one pass in the background when the server starts
    #[serde(default)]
    pub on_startup: bool,
}

fn default_concurrency() -> usize {
    2
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            on_startup: false,
        }
    }
}
