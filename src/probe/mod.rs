//! Technical metadata probing seam.
//!
//! Re-exports the ffprobe tooling from `reelshelf-av` and defines the async
//! [`Prober`] trait the reconciliation engine calls per file.

pub use reelshelf_av::{check_tools, TechnicalMetadata, ToolInfo};

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// Extracts technical metadata from a file on disk.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<TechnicalMetadata>;
}

/// [`Prober`] that runs the `ffprobe` binary.
///
/// Dropping the returned future kills the child process, so callers can bound
/// it with `tokio::time::timeout`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfprobeProber;

impl FfprobeProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<TechnicalMetadata> {
        reelshelf_av::probe_async(path)
            .await
            .with_context(|| format!("ffprobe failed for {}", path.display()))
    }
}

/// Probe a media file synchronously, for the CLI.
pub fn probe_file(path: &Path) -> Result<TechnicalMetadata> {
    reelshelf_av::probe(path).map_err(|e| anyhow::anyhow!("{}", e))
}
