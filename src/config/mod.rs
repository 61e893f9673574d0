mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
///
/// A relative `library.database_path` is resolved against the directory of the
/// config file. Environment overrides are applied before validation.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if config.library.database_path.is_relative() {
        if let Some(dir) = path.parent() {
            config.library.database_path = dir.join(&config.library.database_path);
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    if let Some(path) = find_default_config() {
        return load_config(&path);
    }

    let mut config = Config::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;
    Ok(config)
}

fn find_default_config() -> Option<PathBuf> {
    let default_paths = [
        "./config.toml",
        "./reelshelf.toml",
        "~/.config/reelshelf/config.toml",
        "/etc/reelshelf/config.toml",
    ];

    default_paths
        .iter()
        .map(|path_str| PathBuf::from(shellexpand::tilde(path_str).as_ref()))
        .find(|path| path.exists())
}

/// Apply `VIDEO_DIRECTORY_PATH`, `TMDB_API_KEY` and `BACKEND_PORT`.
///
/// Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(dir) = var("VIDEO_DIRECTORY_PATH") {
        config.library.video_directory = Some(PathBuf::from(shellexpand::tilde(&dir).as_ref()));
    }

    if let Some(key) = var("TMDB_API_KEY") {
        config.metadata.tmdb_api_key = Some(key);
    }

    if let Some(port) = var("BACKEND_PORT") {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("Invalid BACKEND_PORT: {:?}", port))?;
    }

    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.sync.concurrency == 0 {
        anyhow::bail!("Sync concurrency must be at least 1");
    }

    if config.metadata.lookup_timeout_secs == 0 {
        anyhow::bail!("Lookup timeout must be greater than 0");
    }

    if config.metadata.probe_timeout_secs == 0 {
        anyhow::bail!("Probe timeout must be greater than 0");
    }

    if !config
        .library
        .allowed_extensions
        .iter()
        .any(|ext| reelshelf_common::paths::normalize_extension(ext).is_some())
    {
        anyhow::bail!("At least one allowed extension must be configured");
    }

    match &config.library.video_directory {
        Some(dir) if !dir.exists() => {
            tracing::warn!("Video directory does not exist: {:?}", dir);
        }
        None => {
            tracing::warn!("No video directory configured; sync passes will fail until one is set");
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.metadata.language, "en-US");
        assert_eq!(config.metadata.lookup_timeout_secs, 5);
        assert_eq!(config.sync.concurrency, 2);
        assert!(!config.sync.on_startup);
        assert_eq!(
            config.library.allowed_extensions,
            vec!["avi", "mkv", "mov", "mp4", "webm"]
        );
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [library]
            video_directory = "/srv/videos"

            [metadata]
            tmdb_api_key = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.library.video_directory,
            Some(PathBuf::from("/srv/videos"))
        );
        assert_eq!(config.metadata.tmdb_api_key.as_deref(), Some("abc"));
        assert_eq!(config.metadata.probe_timeout_secs, 30);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("VIDEO_DIRECTORY_PATH", "/mnt/videos"),
                ("TMDB_API_KEY", "secret"),
                ("BACKEND_PORT", "4000"),
            ]),
        )
        .unwrap();

        assert_eq!(
            config.library.video_directory,
            Some(PathBuf::from("/mnt/videos"))
        );
        assert_eq!(config.metadata.tmdb_api_key.as_deref(), Some("secret"));
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut config = Config::default();
        config.metadata.tmdb_api_key = Some("from-file".to_string());
        apply_env_overrides(&mut config, env(&[("TMDB_API_KEY", "  ")])).unwrap();
        assert_eq!(config.metadata.tmdb_api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = Config::default();
        let result = apply_env_overrides(&mut config, env(&[("BACKEND_PORT", "http")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.sync.concurrency = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.library.allowed_extensions = vec![" ".to_string()];
        assert!(validate_config(&config).is_err());

        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_load_resolves_database_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[library]\ndatabase_path = \"data/library.db\"\n[sync]\nconcurrency = 4\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.library.database_path,
            dir.path().join("data/library.db")
        );
        assert_eq!(config.sync.concurrency, 4);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config(Path::new("/nonexistent/reelshelf/config.toml"));
        assert!(result.is_err());
    }
}
