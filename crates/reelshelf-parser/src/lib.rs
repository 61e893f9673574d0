//! # reelshelf-parser
//!
//! Extracts a candidate title and release year from a raw video filename.
//!
//! The parser is total: every input yields a [`ParsedFilename`], possibly with
//! both fields absent. It never fails and never touches the filesystem.
//!
//! ## Quick Start
//!
//! ```
//! use reelshelf_parser::parse_with_reference_year;
//!
//! let parsed = parse_with_reference_year("The.Matrix.1999.mkv", 2024);
//! assert_eq!(parsed.title.as_deref(), Some("The Matrix"));
//! assert_eq!(parsed.year, Some(1999));
//! ```
//!
//! ## Year heuristic
//!
//! Only the first standalone four-digit token is considered, and it is accepted
//! as a year only when it lies strictly between 1880 and the reference year
//! plus five. A resolution like `1080p` is not standalone and is ignored, but a
//! lone `1080` or a track number is rejected by range only.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;

/// Lower bound (exclusive) for an accepted release year.
const MIN_YEAR: u16 = 1880;

/// How far past the reference year a release year may lie (exclusive).
const FUTURE_YEARS: u16 = 5;

static YEAR_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\b([0-9]{4})\b").unwrap()
});

static EMPTY_PARENS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\(\s*\)").unwrap()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\s+").unwrap()
});

/// Title and year extracted from a filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedFilename {
    /// Cleaned title, `None` when nothing is left after cleanup.
    pub title: Option<String>,
    /// Release year, `None` when no plausible year token was found.
    pub year: Option<u16>,
}

/// Parse a filename using the current UTC year as the reference year.
pub fn parse(filename: &str) -> ParsedFilename {
    let current_year = chrono::Utc::now().year();
    let reference_year = u16::try_from(current_year).unwrap_or(u16::MAX - FUTURE_YEARS);
    parse_with_reference_year(filename, reference_year)
}

/// Parse a filename against an explicit reference year.
///
/// # Examples
///
/// ```
/// use reelshelf_parser::parse_with_reference_year;
///
/// let parsed = parse_with_reference_year("Movie.2099.mp4", 2024);
/// assert_eq!(parsed.year, None);
/// assert_eq!(parsed.title.as_deref(), Some("Movie 2099"));
///
/// let parsed = parse_with_reference_year("randomfile.mp4", 2024);
/// assert_eq!(parsed.title.as_deref(), Some("randomfile"));
/// assert_eq!(parsed.year, None);
/// ```
pub fn parse_with_reference_year(filename: &str, reference_year: u16) -> ParsedFilename {
    let stem = strip_extension(filename);
    let mut title = stem.replace(['.', '_'], " ");

    let mut year = None;
    if let Some(token) = YEAR_TOKEN.captures(&title).and_then(|caps| caps.get(1)) {
        let candidate: Option<u16> = token.as_str().parse().ok();
        let upper = reference_year.saturating_add(FUTURE_YEARS);
        if let Some(candidate) = candidate.filter(|y| *y > MIN_YEAR && *y < upper) {
            year = Some(candidate);
            title.replace_range(token.range(), "");
            title = EMPTY_PARENS.replace_all(&title, "").into_owned();
        }
    }

    let title = WHITESPACE.replace_all(&title, " ").trim().to_string();

    ParsedFilename {
        title: if title.is_empty() { None } else { Some(title) },
        year,
    }
}

/// Drop the last `.`-delimited segment. Names without a dot, or whose only
/// dot is the first character, are returned whole.
fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REF: u16 = 2024;

    fn title_year(filename: &str) -> (Option<String>, Option<u16>) {
        let parsed = parse_with_reference_year(filename, REF);
        (parsed.title, parsed.year)
    }

    #[test]
    fn test_dotted_title_with_year() {
        assert_eq!(
            title_year("The.Matrix.1999.mkv"),
            (Some("The Matrix".to_string()), Some(1999))
        );
    }

    #[test]
    fn test_no_year() {
        assert_eq!(
            title_year("randomfile.mp4"),
            (Some("randomfile".to_string()), None)
        );
    }

    #[test]
    fn test_future_year_rejected() {
        assert_eq!(
            title_year("Movie.2099.mp4"),
            (Some("Movie 2099".to_string()), None)
        );
        // Upper bound is exclusive: reference + 5 is rejected, reference + 4 accepted.
        assert_eq!(title_year("Movie.2029.mp4").1, None);
        assert_eq!(title_year("Movie.2028.mp4").1, Some(2028));
    }

    #[test]
    fn test_lower_bound_exclusive() {
        assert_eq!(title_year("Old.1880.mp4").1, None);
        assert_eq!(title_year("Old.1881.mp4").1, Some(1881));
    }

    #[test]
    fn test_parenthesised_year() {
        assert_eq!(
            title_year("Alien (1979).mkv"),
            (Some("Alien".to_string()), Some(1979))
        );
        assert_eq!(
            title_year("Blade_Runner_(1982)_Final_Cut.mkv"),
            (Some("Blade Runner Final Cut".to_string()), Some(1982))
        );
    }

    #[test]
    fn test_resolution_is_not_a_year() {
        assert_eq!(
            title_year("Inception.2010.1080p.mkv"),
            (Some("Inception 1080p".to_string()), Some(2010))
        );
        assert_eq!(
            title_year("Clip.1080p.mp4"),
            (Some("Clip 1080p".to_string()), None)
        );
    }

    #[test]
    fn test_only_first_token_considered() {
        // 1080 is out of range, so 1999 is never looked at.
        assert_eq!(
            title_year("Show.1080.1999.mp4"),
            (Some("Show 1080 1999".to_string()), None)
        );
        assert_eq!(
            title_year("2001.A.Space.Odyssey.1968.mkv"),
            (Some("A Space Odyssey 1968".to_string()), Some(2001))
        );
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(
            title_year("  Some__Movie ..  2005 .avi"),
            (Some("Some Movie".to_string()), Some(2005))
        );
    }

    #[test]
    fn test_empty_title() {
        assert_eq!(title_year("1999.mp4"), (None, Some(1999)));
        assert_eq!(title_year("(2001).mkv"), (None, Some(2001)));
        assert_eq!(title_year(""), (None, None));
        assert_eq!(title_year("..."), (None, None));
    }

    #[test]
    fn test_extension_edge_cases() {
        assert_eq!(title_year("noextension"), (Some("noextension".to_string()), None));
        assert_eq!(title_year(".hidden"), (Some("hidden".to_string()), None));
        assert_eq!(
            title_year("archive.tar.mkv"),
            (Some("archive tar".to_string()), None)
        );
    }

    #[test]
    fn test_parse_uses_current_year() {
        let parsed = parse("The.Matrix.1999.mkv");
        assert_eq!(parsed.year, Some(1999));
        assert_eq!(parse("Movie.9999.mp4").year, None);
    }

    #[test]
    fn test_non_ascii_title() {
        assert_eq!(
            title_year("Amélie.2001.mkv"),
            (Some("Amélie".to_string()), Some(2001))
        );
    }
}
