//! # reelshelf-av
//!
//! Technical metadata probing for video files.
//!
//! This crate runs `ffprobe` against a file and reduces its JSON report to a
//! [`TechnicalMetadata`] value: duration, dimensions, codec, bit rate, frame
//! rate, aspect ratio and byte size.
//!
//! ## Features
//!
//! - `async` - Non-blocking probing on tokio, child killed on drop
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use reelshelf_av::probe;
//!
//! let meta = probe("/path/to/video.mkv")?;
//! println!("Duration: {:?}", meta.duration_seconds);
//! # Ok::<(), reelshelf_av::Error>(())
//! ```

mod error;
pub mod probe;
pub mod tools;

pub use error::{Error, Result};
pub use probe::{parse_ffprobe_output, parse_frame_rate, TechnicalMetadata};
pub use tools::{check_tool, check_tools, ToolInfo};

/// Probe a media file and return its technical metadata.
pub fn probe<P: AsRef<std::path::Path>>(path: P) -> Result<TechnicalMetadata> {
    probe::probe_with_ffprobe(path.as_ref())
}

/// Probe a media file on the tokio runtime.
#[cfg(feature = "async")]
pub async fn probe_async<P: AsRef<std::path::Path>>(path: P) -> Result<TechnicalMetadata> {
    probe::probe_with_ffprobe_async(path.as_ref()).await
}
