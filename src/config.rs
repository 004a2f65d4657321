//! Series configuration
//!
//! Each series is described by a YAML file holding its naming policy, download
//! settings and, optionally, an inline episode catalog or the playlist ids to
//! fetch one from.

use crate::episode_parser::EpisodeRecord;
use crate::template::{DirectoryPattern, NamingPattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Local directory searched for series configs when none is given
pub const DEFAULT_CONFIG_DIR: &str = "config/series";

/// Errors that can occur while locating or loading a series config
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file with the requested name
    #[error("Series config '{name}' not found in {}{}", .dir.display(), available_hint(.available))]
    NotFound {
        name: String,
        dir: PathBuf,
        available: Vec<String>,
    },

    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// The file parsed but holds unusable values
    #[error("Invalid config {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    /// Failed to determine the platform data directory
    #[error("Failed to determine data directory location")]
    DataDirectoryNotFound,
}

fn available_hint(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(" (available: {})", available.join(", "))
    }
}

/// How spaces in the series name are rendered into `{series_name}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpacePolicy {
    /// Insert the series name verbatim
    #[default]
    Keep,
    /// Replace every space with an underscore
    Underscore,
}

impl SpacePolicy {
    pub fn apply(self, series_name: &str) -> String {
        match self {
            SpacePolicy::Keep => series_name.to_string(),
            SpacePolicy::Underscore => series_name.replace(' ', "_"),
        }
    }
}

/// Subtitle download options passed to the downloader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleSettings {
    pub enabled: bool,
    pub lang: String,
    /// Embed subtitles into the media container
    pub embed: bool,
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            lang: "en".to_string(),
            embed: true,
        }
    }
}

/// Naming and download policy for one series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub series_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub naming_pattern: NamingPattern,

    #[serde(default)]
    pub directory_pattern: DirectoryPattern,

    #[serde(default)]
    pub series_name_spaces: SpacePolicy,

    /// Maximum vertical resolution to request
    #[serde(default = "default_quality")]
    pub quality: u32,

    #[serde(default)]
    pub subtitles: SubtitleSettings,

    /// Extension of downloaded media files, without the dot
    #[serde(default = "default_media_extension")]
    pub media_extension: String,

    /// Per-episode limit for the downloader subprocess
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_timeout_secs: Option<u64>,

    /// Inline catalog: season label to ordered episode list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<BTreeMap<String, Vec<EpisodeRecord>>>,

    /// Season label to YouTube playlist id, used by `fetch`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlists: Option<BTreeMap<String, String>>,
}

fn default_quality() -> u32 {
    1080
}

fn default_media_extension() -> String {
    "mp4".to_string()
}

impl SeriesConfig {
    /// Creates a config with every optional field at its default
    pub fn new(series_name: impl Into<String>) -> Self {
        Self {
            series_name: series_name.into(),
            description: None,
            naming_pattern: NamingPattern::default(),
            directory_pattern: DirectoryPattern::default(),
            series_name_spaces: SpacePolicy::default(),
            quality: default_quality(),
            subtitles: SubtitleSettings::default(),
            media_extension: default_media_extension(),
            download_timeout_secs: None,
            episodes: None,
            playlists: None,
        }
    }

    /// Lowercased series name with spaces replaced, used for derived file names
    pub fn series_slug(&self) -> String {
        self.series_name.trim().to_lowercase().replace(' ', "_")
    }

    fn validate(mut self, path: &Path) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        if self.series_name.trim().is_empty() {
            return Err(invalid("series_name must not be empty"));
        }

        self.media_extension = self.media_extension.trim_start_matches('.').to_string();
        if self.media_extension.is_empty() {
            return Err(invalid("media_extension must not be empty"));
        }

        if let Some(extension) = self.naming_pattern.template().literal_extension() {
            if !extension.eq_ignore_ascii_case(&self.media_extension) {
                return Err(invalid(&format!(
                    "naming_pattern ends in .{} but media_extension is {}",
                    extension, self.media_extension
                )));
            }
        }

        if self.quality == 0 {
            return Err(invalid("quality must be a positive resolution"));
        }

        Ok(self)
    }
}

/// Loads and validates a series config from a YAML file
pub fn load_config(path: &Path) -> Result<SeriesConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: SeriesConfig =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    config.validate(path)
}

/// Finds `<name>.yaml` (or `.yml`) in the config directory and loads it
pub fn find_config(config_dir: &Path, name: &str) -> Result<SeriesConfig, ConfigError> {
    for extension in ["yaml", "yml"] {
        let path = config_dir.join(format!("{}.{}", name, extension));
        if path.is_file() {
            return load_config(&path);
        }
    }

    Err(ConfigError::NotFound {
        name: name.to_string(),
        dir: config_dir.to_path_buf(),
        available: list_available_configs(config_dir),
    })
}

/// Lists the names of all series configs in a directory
///
/// A missing or unreadable directory yields an empty list.
pub fn list_available_configs(config_dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(config_dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
        .collect();

    names.sort();
    names.dedup();
    names
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("de", "westhoffswelt", "series_downloader")
}

/// Resolves the directory holding series configs
///
/// An explicit directory always wins. Otherwise the local `config/series`
/// directory is used when present, then the platform config directory.
pub fn resolve_config_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }

    let local = PathBuf::from(DEFAULT_CONFIG_DIR);
    if local.is_dir() {
        return local;
    }

    project_dirs()
        .map(|dirs| dirs.config_dir().join("series"))
        .filter(|dir| dir.is_dir())
        .unwrap_or(local)
}

/// Default location of the fetched playlists file for a series
///
/// - Linux: ~/.local/share/series_downloader/playlists/<slug>.json
/// - macOS: ~/Library/Application Support/de.westhoffswelt.series_downloader/playlists/<slug>.json
/// - Windows: %APPDATA%\westhoffswelt\series_downloader\data\playlists\<slug>.json
pub fn default_playlists_path(config: &SeriesConfig) -> Result<PathBuf, ConfigError> {
    let dirs = project_dirs().ok_or(ConfigError::DataDirectoryNotFound)?;
    Ok(dirs
        .data_dir()
        .join("playlists")
        .join(format!("{}.json", config.series_slug())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateValues;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "test.yaml",
            r#"
series_name: "Test Series"
description: "Test description"
quality: 720
episodes:
  Season 1:
    - title: "S01E01 Test"
      id: "abc123"
"#,
        );

        let config = load_config(&path).unwrap();
        assert_eq!(config.series_name, "Test Series");
        assert_eq!(config.quality, 720);
        let episodes = config.episodes.unwrap();
        assert_eq!(episodes["Season 1"].len(), 1);
        assert_eq!(episodes["Season 1"][0].id, "abc123");
    }

    #[test]
    fn test_defaults_for_absent_fields() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "min.yaml", "series_name: Minimal\n");

        let config = load_config(&path).unwrap();
        assert_eq!(config.naming_pattern.template().pattern(), NamingPattern::DEFAULT);
        assert_eq!(config.directory_pattern.template().pattern(), DirectoryPattern::DEFAULT);
        assert_eq!(config.quality, 1080);
        assert_eq!(config.subtitles, SubtitleSettings::default());
        assert_eq!(config.media_extension, "mp4");
        assert_eq!(config.series_name_spaces, SpacePolicy::Keep);
        assert!(config.episodes.is_none());
    }

    #[test]
    fn test_load_config_with_subtitles() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "subs.yaml",
            r#"
series_name: "Test"
subtitles:
  enabled: false
  lang: "de"
"#,
        );

        let config = load_config(&path).unwrap();
        assert!(!config.subtitles.enabled);
        assert_eq!(config.subtitles.lang, "de");
        assert!(config.subtitles.embed);
    }

    #[test]
    fn test_load_config_with_custom_patterns() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "custom.yaml",
            r#"
series_name: "Test Show"
naming_pattern: "{season}_{episode}_{title}.mp4"
directory_pattern: "Series_{series_name}"
series_name_spaces: underscore
"#,
        );

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.naming_pattern.template().pattern(),
            "{season}_{episode}_{title}.mp4"
        );
        assert_eq!(config.series_name_spaces, SpacePolicy::Underscore);
        let rendered = config.directory_pattern.template().render(&TemplateValues {
            series_name: Some(&config.series_name_spaces.apply(&config.series_name)),
            ..Default::default()
        });
        assert_eq!(rendered, "Series_Test_Show");
    }

    #[test]
    fn test_unknown_placeholder_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "bad.yaml",
            "series_name: Test\nnaming_pattern: \"{show}_{title}.mp4\"\n",
        );

        assert!(matches!(load_config(&path), Err(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn test_multiple_seasons_and_explicit_numbers() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "multi.yaml",
            r#"
series_name: "Test"
episodes:
  Season 1:
    - title: "S01E01 Test"
      id: "abc123"
      season: 1
      episode: 1
  Season 2:
    - title: "S02E01 Test"
      id: "def456"
"#,
        );

        let config = load_config(&path).unwrap();
        let episodes = config.episodes.unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes["Season 1"][0].season, Some(1));
        assert_eq!(episodes["Season 2"][0].season, None);
    }

    #[test]
    fn test_empty_series_name_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "empty.yaml", "series_name: \"  \"\n");
        assert!(matches!(load_config(&path), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_media_extension_dot_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "ext.yaml",
            "series_name: Test\nmedia_extension: .mkv\nnaming_pattern: \"S{season:02d}E{episode:02d}_{title}.mkv\"\n",
        );
        assert_eq!(load_config(&path).unwrap().media_extension, "mkv");
    }

    #[test]
    fn test_pattern_extension_must_match_media_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "mismatch.yaml", "series_name: Test\nmedia_extension: mkv\n");
        assert!(matches!(load_config(&path), Err(ConfigError::Invalid { .. })));

        let path = write_config(
            &dir,
            "open.yaml",
            "series_name: Test\nmedia_extension: mkv\nnaming_pattern: \"{season}x{episode:02d}.{title}\"\n",
        );
        assert!(load_config(&path).is_ok());
    }

    #[test]
    fn test_find_config_lists_available_on_miss() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "alpha.yaml", "series_name: Alpha\n");
        write_config(&dir, "beta.yml", "series_name: Beta\n");
        write_config(&dir, "notes.txt", "not a config");

        assert_eq!(find_config(dir.path(), "beta").unwrap().series_name, "Beta");

        match find_config(dir.path(), "gamma") {
            Err(ConfigError::NotFound { available, .. }) => {
                assert_eq!(available, vec!["alpha".to_string(), "beta".to_string()]);
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_list_missing_directory() {
        assert!(list_available_configs(Path::new("/nonexistent/config/dir")).is_empty());
    }

    #[test]
    fn test_explicit_config_dir_wins() {
        let explicit = Path::new("/some/where");
        assert_eq!(resolve_config_dir(Some(explicit)), explicit.to_path_buf());
    }

    #[test]
    fn test_series_slug() {
        assert_eq!(SeriesConfig::new("Number Blocks").series_slug(), "number_blocks");
    }
}
