//! Technical metadata probing.
//!
//! Probing shells out to `ffprobe` and reads its JSON report. The blocking
//! entry point is always available; the async one needs the `async` feature.

mod ffprobe;
mod types;

pub use ffprobe::{parse_ffprobe_output, probe_with_ffprobe};
pub use types::TechnicalMetadata;

#[cfg(feature = "async")]
pub use ffprobe::probe_with_ffprobe_async;

/// Parse an ffprobe rational (`"24000/1001"`) or decimal frame rate to FPS.
///
/// Returns `None` for a zero denominator, which ffprobe reports as `"0/0"`
/// for streams without a known rate.
pub fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let parts: Vec<&str> = rate_str.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate_str.parse().ok().filter(|v: &f64| v.is_finite())
}
