//! FFprobe-based media probing.

use super::types::TechnicalMetadata;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

pub(crate) const FFPROBE_ARGS: [&str; 6] = [
    "-v",
    "quiet",
    "-print_format",
    "json",
    "-show_format",
    "-show_streams",
];

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<i64>,
    height: Option<i64>,
    avg_frame_rate: Option<String>,
    display_aspect_ratio: Option<String>,
    bit_rate: Option<String>,
}

/// Probe a media file using ffprobe, blocking on the child process.
pub fn probe_with_ffprobe(path: &Path) -> Result<TechnicalMetadata> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    let output = std::process::Command::new("ffprobe")
        .args(FFPROBE_ARGS)
        .arg(path)
        .output()
        .map_err(spawn_error)?;

    let mut meta = metadata_from_output(output.status.success(), &output.stdout, &output.stderr)?;
    meta.size_bytes = std::fs::metadata(path).ok().and_then(|m| i64::try_from(m.len()).ok());
    Ok(meta)
}

/// Probe a media file using ffprobe without blocking the runtime.
///
/// The child is killed if the returned future is dropped, so wrapping this in
/// `tokio::time::timeout` also bounds the subprocess.
#[cfg(feature = "async")]
pub async fn probe_with_ffprobe_async(path: &Path) -> Result<TechnicalMetadata> {
    let fs_meta = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::file_not_found(path))
        }
        Err(e) => return Err(Error::Io(e)),
    };

    #[cfg(feature = "tracing")]
    tracing::trace!(path = %path.display(), "spawning ffprobe");

    let output = tokio::process::Command::new("ffprobe")
        .args(FFPROBE_ARGS)
        .arg(path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(spawn_error)?;

    let mut meta = metadata_from_output(output.status.success(), &output.stdout, &output.stderr)?;
    meta.size_bytes = i64::try_from(fs_meta.len()).ok();
    Ok(meta)
}

fn spawn_error(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::tool_not_found("ffprobe")
    } else {
        Error::Io(e)
    }
}

fn metadata_from_output(success: bool, stdout: &[u8], stderr: &[u8]) -> Result<TechnicalMetadata> {
    if !success {
        let stderr = String::from_utf8_lossy(stderr);
        return Err(Error::tool_failed("ffprobe", stderr.trim().to_string()));
    }

    let json_str = std::str::from_utf8(stdout)
        .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))?;

    parse_ffprobe_output(json_str)
}

/// Parse ffprobe's `-print_format json -show_format -show_streams` output.
///
/// Duration and bit rate come from the format section, with the bit rate
/// falling back to the first video stream's. Stream fields come from the first
/// video stream. Values that do not parse to finite numbers are dropped.
/// `size_bytes` is left unset.
pub fn parse_ffprobe_output(json: &str) -> Result<TechnicalMetadata> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let (duration, format_bit_rate) = match &output.format {
        Some(format) => (format.duration.as_deref(), format.bit_rate.as_deref()),
        None => (None, None),
    };

    let bit_rate = format_bit_rate
        .and_then(parse_integer)
        .or_else(|| video.and_then(|v| v.bit_rate.as_deref()).and_then(parse_integer));

    Ok(TechnicalMetadata {
        size_bytes: None,
        duration_seconds: duration.and_then(parse_finite),
        width: video.and_then(|v| v.width).and_then(|w| i32::try_from(w).ok()),
        height: video.and_then(|v| v.height).and_then(|h| i32::try_from(h).ok()),
        codec_name: video.and_then(|v| v.codec_name.clone()),
        bit_rate,
        avg_frame_rate: video.and_then(|v| v.avg_frame_rate.clone()),
        display_aspect_ratio: video.and_then(|v| v.display_aspect_ratio.clone()),
    })
}

fn parse_finite(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_integer(value: &str) -> Option<i64> {
    let value = value.trim();
    value
        .parse::<i64>()
        .ok()
        .or_else(|| parse_finite(value).map(|v| v as i64))
}
