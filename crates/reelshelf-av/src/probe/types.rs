//! Technical metadata types.

use serde::{Deserialize, Serialize};

/// Technical metadata of a video file.
///
/// Every field is optional: a stream without dimensions, a container without a
/// duration, or an unreadable file all produce a partially filled value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalMetadata {
    /// File size in bytes, from filesystem metadata.
    pub size_bytes: Option<i64>,
    /// Container duration in seconds.
    pub duration_seconds: Option<f64>,
    /// Width of the first video stream in pixels.
    pub width: Option<i32>,
    /// Height of the first video stream in pixels.
    pub height: Option<i32>,
    /// Codec of the first video stream (e.g. "h264", "hevc").
    pub codec_name: Option<String>,
    /// Overall bit rate in bits per second.
    pub bit_rate: Option<i64>,
    /// Average frame rate as reported, e.g. "24000/1001".
    pub avg_frame_rate: Option<String>,
    /// Display aspect ratio, e.g. "16:9".
    pub display_aspect_ratio: Option<String>,
}

impl TechnicalMetadata {
    /// Metadata carrying only the file size.
    pub fn size_only(size_bytes: Option<i64>) -> Self {
        Self {
            size_bytes,
            ..Default::default()
        }
    }

    /// Frame rate in frames per second, if the reported rate is parseable.
    pub fn frames_per_second(&self) -> Option<f64> {
        self.avg_frame_rate
            .as_deref()
            .and_then(super::parse_frame_rate)
    }

    /// Resolution formatted as `WIDTHxHEIGHT`.
    pub fn resolution(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
            _ => None,
        }
    }

    /// True when nothing beyond the file size is known.
    pub fn is_degraded(&self) -> bool {
        self.duration_seconds.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.codec_name.is_none()
            && self.bit_rate.is_none()
            && self.avg_frame_rate.is_none()
            && self.display_aspect_ratio.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_only_is_degraded() {
        let meta = TechnicalMetadata::size_only(Some(42));
        assert_eq!(meta.size_bytes, Some(42));
        assert!(meta.is_degraded());
        assert_eq!(meta.resolution(), None);
    }

    #[test]
    fn test_resolution_and_fps() {
        let meta = TechnicalMetadata {
            width: Some(1920),
            height: Some(1080),
            avg_frame_rate: Some("30000/1001".to_string()),
            ..Default::default()
        };
        assert!(!meta.is_degraded());
        assert_eq!(meta.resolution().as_deref(), Some("1920x1080"));
        let fps = meta.frames_per_second().unwrap();
        assert!((fps - 29.97).abs() < 0.01);
    }
}
