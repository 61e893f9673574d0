//! External tool detection.

use std::path::PathBuf;
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// First line of the tool's version output.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available by running it with `-version`.
///
/// # Example
///
/// ```no_run
/// use reelshelf_av::check_tool;
///
/// let info = check_tool("ffprobe");
/// if info.available {
///     println!("ffprobe version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str) -> ToolInfo {
    check_tool_with_arg(name, "-version")
}

/// Check if a tool is available using a custom version argument.
pub fn check_tool_with_arg(name: &str, version_arg: &str) -> ToolInfo {
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => ToolInfo {
            name: name.to_string(),
            available: true,
            version: String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string()),
            path: which::which(name).ok(),
        },
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Check the media tools reelshelf uses: ffprobe (required) and ffmpeg.
pub fn check_tools() -> Vec<ToolInfo> {
    vec![check_tool("ffprobe"), check_tool("ffmpeg")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tool_not_found() {
        let info = check_tool("nonexistent_tool_12345");
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }

    #[test]
    fn test_check_tools_names() {
        let names: Vec<_> = check_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["ffprobe", "ffmpeg"]);
    }
}
