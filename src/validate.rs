//! Download validation
//!
//! Compares an episode catalog with what is on disk below the download root.

use crate::config::SeriesConfig;
use crate::episode_parser::{EpisodeId, resolve_episode};
use crate::file_operations::generate_season_dir;
use crate::file_resolver::{
    episode_exists, episode_token_in_filename, is_canonical_filename, is_video_content,
    scan_media_files,
};
use crate::metadata_retrieval::EpisodeCatalog;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A media file found in a season directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedFile {
    pub path: PathBuf,
    pub file_name: String,
    /// Episode encoded in the name, in any naming style
    pub episode: Option<EpisodeId>,
    pub size_bytes: u64,
    /// Human-readable size
    pub size: String,
    pub canonical: bool,
    /// Whether the content sniffs as a video container
    pub is_video: bool,
}

/// A catalog episode with no matching file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingEpisode {
    pub episode: EpisodeId,
    pub title: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonValidation {
    pub label: String,
    pub directories: Vec<PathBuf>,
    pub expected: usize,
    pub found: usize,
    pub missing: Vec<MissingEpisode>,
    /// Titles of catalog entries that carry no episode identifier
    pub unparseable: Vec<String>,
    pub files: Vec<ValidatedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub generated_at: DateTime<Local>,
    pub series_name: String,
    pub download_root: PathBuf,
    pub total_expected: usize,
    pub total_found: usize,
    pub seasons: Vec<SeasonValidation>,
}

impl ValidationReport {
    pub fn total_missing(&self) -> usize {
        self.seasons.iter().map(|s| s.missing.len()).sum()
    }

    /// Files whose names are not in canonical form
    pub fn non_canonical_files(&self) -> impl Iterator<Item = &ValidatedFile> {
        self.seasons
            .iter()
            .flat_map(|s| s.files.iter())
            .filter(|f| !f.canonical)
    }

    /// Files whose content does not look like a video
    pub fn non_video_files(&self) -> impl Iterator<Item = &ValidatedFile> {
        self.seasons
            .iter()
            .flat_map(|s| s.files.iter())
            .filter(|f| !f.is_video)
    }

    /// No episode missing and every file is a video
    pub fn is_complete(&self) -> bool {
        self.total_missing() == 0 && self.non_video_files().next().is_none()
    }
}

fn validate_file(path: PathBuf, file_name: String, extension: &str) -> ValidatedFile {
    let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    ValidatedFile {
        episode: episode_token_in_filename(&file_name),
        canonical: is_canonical_filename(&file_name, extension),
        is_video: is_video_content(&path),
        size: humansize::format_size(size_bytes, humansize::DECIMAL),
        size_bytes,
        path,
        file_name,
    }
}

/// Checks every catalog season against its directories on disk
///
/// Missing season directories simply yield no files. Nothing is created.
pub fn validate_downloads(
    config: &SeriesConfig,
    catalog: &EpisodeCatalog,
    download_root: &Path,
) -> ValidationReport {
    let extension = &config.media_extension;
    let mut seasons = Vec::new();
    let mut scanned = BTreeSet::new();

    for season in catalog.seasons() {
        let mut directories = BTreeSet::new();
        let mut missing = Vec::new();
        let mut unparseable = Vec::new();

        for record in &season.episodes {
            let Some(id) = resolve_episode(record) else {
                unparseable.push(record.title.clone());
                continue;
            };

            let dir = generate_season_dir(
                download_root,
                &config.series_name,
                id.season,
                config,
                &season.label,
            );

            if !episode_exists(&dir, id.season, id.episode, extension) {
                missing.push(MissingEpisode {
                    episode: id,
                    title: record.title.clone(),
                    id: record.id.clone(),
                });
            }
            directories.insert(dir);
        }

        // A directory shared by several catalog labels is counted once
        let files: Vec<ValidatedFile> = directories
            .iter()
            .filter(|dir| scanned.insert(dir.to_path_buf()))
            .filter(|dir| dir.is_dir())
            .filter_map(|dir| scan_media_files(dir, extension).ok())
            .flatten()
            .map(|file| {
                let name = file.file_name();
                validate_file(file.path, name, extension)
            })
            .collect();

        seasons.push(SeasonValidation {
            label: season.label.clone(),
            directories: directories.into_iter().collect(),
            expected: season.episodes.len(),
            found: files.len(),
            missing,
            unparseable,
            files,
        });
    }

    ValidationReport {
        generated_at: Local::now(),
        series_name: config.series_name.clone(),
        download_root: download_root.to_path_buf(),
        total_expected: seasons.iter().map(|s| s.expected).sum(),
        total_found: seasons.iter().map(|s| s.found).sum(),
        seasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode_parser::EpisodeRecord;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn catalog() -> EpisodeCatalog {
        EpisodeCatalog::from_seasons(BTreeMap::from([
            (
                "Season 1".to_string(),
                vec![
                    EpisodeRecord::new("S01E01 One", "a1"),
                    EpisodeRecord::new("S01E02 Two", "a2"),
                    EpisodeRecord::new("Trailer", "t0"),
                ],
            ),
            (
                "Season 2".to_string(),
                vec![EpisodeRecord::new("S02E01 Eleven", "b1")],
            ),
        ]))
    }

    #[test]
    fn test_report_counts() {
        let temp = TempDir::new().unwrap();
        let season1 = temp.path().join("Season_1_HD");
        fs::create_dir(&season1).unwrap();
        fs::write(season1.join("S01E01-One.mp4"), b"not really a video").unwrap();

        let config = SeriesConfig::new("Numberblocks");
        let report = validate_downloads(&config, &catalog(), temp.path());

        assert_eq!(report.total_expected, 4);
        assert_eq!(report.total_found, 1);
        assert_eq!(report.total_missing(), 2);
        assert!(!report.is_complete());

        let first = &report.seasons[0];
        assert_eq!(first.label, "Season 1");
        assert_eq!(first.unparseable, vec!["Trailer"]);
        assert_eq!(first.missing[0].episode, EpisodeId::new(1, 2));
        assert_eq!(first.files[0].episode, Some(EpisodeId::new(1, 1)));
        assert_eq!(first.files[0].size, "18 B");
        assert!(!first.files[0].canonical);
        assert!(!first.files[0].is_video);

        assert_eq!(report.non_canonical_files().count(), 1);
        assert!(!temp.path().join("Season_2_HD").exists());
    }

    #[test]
    fn test_shared_season_directory_counted_once() {
        let temp = TempDir::new().unwrap();
        let season1 = temp.path().join("Season_1_HD");
        fs::create_dir(&season1).unwrap();
        fs::write(season1.join("S01E01_One.mp4"), b"data").unwrap();
        fs::write(season1.join("S01E02_Two.mp4"), b"data").unwrap();

        let catalog = EpisodeCatalog::from_seasons(BTreeMap::from([
            ("Season 1".to_string(), vec![EpisodeRecord::new("S01E01 One", "a1")]),
            ("Season 1 Extras".to_string(), vec![EpisodeRecord::new("S01E02 Two", "a2")]),
        ]));

        let config = SeriesConfig::new("Numberblocks");
        let report = validate_downloads(&config, &catalog, temp.path());

        assert_eq!(report.total_expected, 2);
        assert_eq!(report.total_found, 2);
        assert_eq!(report.total_missing(), 0);
        assert_eq!(report.seasons[0].found, 2);
        assert_eq!(report.seasons[1].found, 0);
        assert_eq!(report.seasons[1].directories, vec![season1]);
    }

    #[test]
    fn test_report_serializes() {
        let temp = TempDir::new().unwrap();
        let config = SeriesConfig::new("Numberblocks");
        let report = validate_downloads(&config, &catalog(), temp.path());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total_expected"], 4);
        assert_eq!(json["seasons"][1]["missing"][0]["episode"]["season"], 2);
    }
}
