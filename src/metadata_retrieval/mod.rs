/// Episode catalogs for a series.
///
/// A catalog lists the episodes of each season, keyed by a season label such as
/// `"Season 1"`. It comes either inline from the series config or from a
/// playlists file previously written by a [`PlaylistProvider`].
mod yt_dlp;
mod yt_dlp_types;

pub use yt_dlp::YtDlpPlaylistProvider;

use crate::config::SeriesConfig;
use crate::episode_parser::EpisodeRecord;
use crate::store::{self, StoreError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the provider's response
    #[error("Failed to parse playlist data: {0}")]
    ParseError(String),

    /// No playlists file exists for a config without inline episodes
    #[error(
        "Playlists file not found: {path}\nRun the fetch command first, or pass --playlists"
    )]
    PlaylistsNotFound { path: PathBuf },

    /// Reading or writing the playlists file failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One season's playlist as stored in the playlists file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonPlaylist {
    pub playlist_id: String,
    pub url: String,
    pub episode_count: usize,
    pub episodes: Vec<EpisodeRecord>,
}

impl SeasonPlaylist {
    pub fn new(playlist_id: &str, episodes: Vec<EpisodeRecord>) -> Self {
        Self {
            playlist_id: playlist_id.to_string(),
            url: playlist_url(playlist_id),
            episode_count: episodes.len(),
            episodes,
        }
    }
}

/// Contents of a playlists file, season label to playlist
pub type PlaylistCatalog = BTreeMap<String, SeasonPlaylist>;

/// Returns the public URL of a playlist id
pub fn playlist_url(playlist_id: &str) -> String {
    format!("https://www.youtube.com/playlist?list={}", playlist_id)
}

/// Trait for sources that can list the videos of a playlist.
pub trait PlaylistProvider {
    /// Fetches all entries of a playlist, in playlist order
    fn fetch_playlist(&self, playlist_id: &str) -> Result<Vec<EpisodeRecord>, MetadataRetrievalError>;
}

/// Episodes of one season, under the label used in the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonEpisodes {
    pub label: String,
    pub episodes: Vec<EpisodeRecord>,
}

/// The full list of episodes to process, seasons in natural label order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeCatalog {
    seasons: Vec<SeasonEpisodes>,
}

impl EpisodeCatalog {
    /// Builds a catalog from season label to episode list
    pub fn from_seasons(seasons: BTreeMap<String, Vec<EpisodeRecord>>) -> Self {
        let mut seasons: Vec<SeasonEpisodes> = seasons
            .into_iter()
            .map(|(label, episodes)| SeasonEpisodes { label, episodes })
            .collect();
        seasons.sort_by(|a, b| natural_cmp(&a.label, &b.label));
        Self { seasons }
    }

    pub fn from_playlists(playlists: PlaylistCatalog) -> Self {
        Self::from_seasons(
            playlists
                .into_iter()
                .map(|(label, playlist)| (label, playlist.episodes))
                .collect(),
        )
    }

    /// Loads the catalog for a series
    ///
    /// Inline `episodes` in the config win. Otherwise the playlists file at
    /// `playlists_path` must exist.
    pub fn load(config: &SeriesConfig, playlists_path: &Path) -> Result<Self, MetadataRetrievalError> {
        if let Some(episodes) = &config.episodes {
            return Ok(Self::from_seasons(episodes.clone()));
        }

        let playlists = load_playlists(playlists_path)?.ok_or_else(|| {
            MetadataRetrievalError::PlaylistsNotFound {
                path: playlists_path.to_path_buf(),
            }
        })?;

        Ok(Self::from_playlists(playlists))
    }

    pub fn seasons(&self) -> &[SeasonEpisodes] {
        &self.seasons
    }

    /// Total number of episode records over all seasons
    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|s| s.episodes.len()).sum()
    }
}

/// Reads a playlists file, `None` if it does not exist
pub fn load_playlists(path: &Path) -> Result<Option<PlaylistCatalog>, MetadataRetrievalError> {
    Ok(store::read_json_file(path)?)
}

pub fn save_playlists(path: &Path, playlists: &PlaylistCatalog) -> Result<(), MetadataRetrievalError> {
    Ok(store::write_json_file(path, playlists)?)
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum LabelChunk<'a> {
    Number(u64),
    Text(&'a str),
}

fn label_chunks(label: &str) -> Vec<LabelChunk<'_>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (i, c) in label.char_indices() {
        let digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != digit => {
                chunks.push(make_chunk(&label[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }

    if let Some(digit) = in_digits {
        chunks.push(make_chunk(&label[start..], digit));
    }

    chunks
}

fn make_chunk(text: &str, digits: bool) -> LabelChunk<'_> {
    if digits {
        LabelChunk::Number(text.parse().unwrap_or(u64::MAX))
    } else {
        LabelChunk::Text(text)
    }
}

/// Compares season labels so that embedded numbers sort numerically
///
/// `"Season 2"` sorts before `"Season 10"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    label_chunks(a).cmp(&label_chunks(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(title: &str) -> EpisodeRecord {
        EpisodeRecord::new(title, title.to_lowercase())
    }

    #[test]
    fn test_natural_order() {
        let mut labels = vec!["Season 10", "Season 2", "Specials", "Season 1"];
        labels.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(labels, vec!["Season 1", "Season 2", "Season 10", "Specials"]);
    }

    #[test]
    fn test_catalog_from_seasons_is_naturally_ordered() {
        let seasons = BTreeMap::from([
            ("Season 10".to_string(), vec![record("S10E01 Ten")]),
            ("Season 9".to_string(), vec![record("S09E01 Nine"), record("S09E02 Nine Again")]),
        ]);

        let catalog = EpisodeCatalog::from_seasons(seasons);
        let labels: Vec<&str> = catalog.seasons().iter().map(|s| s.label.as_str()).collect();

        assert_eq!(labels, vec!["Season 9", "Season 10"]);
        assert_eq!(catalog.episode_count(), 3);
    }

    #[test]
    fn test_inline_episodes_win_over_playlists() {
        let temp = TempDir::new().unwrap();
        let mut config = SeriesConfig::new("Numberblocks");
        config.episodes = Some(BTreeMap::from([(
            "Season 1".to_string(),
            vec![record("S01E01 One")],
        )]));

        let catalog = EpisodeCatalog::load(&config, &temp.path().join("absent.json")).unwrap();
        assert_eq!(catalog.episode_count(), 1);
    }

    #[test]
    fn test_missing_playlists_file() {
        let temp = TempDir::new().unwrap();
        let config = SeriesConfig::new("Numberblocks");

        let result = EpisodeCatalog::load(&config, &temp.path().join("absent.json"));
        assert!(matches!(result, Err(MetadataRetrievalError::PlaylistsNotFound { .. })));
    }

    #[test]
    fn test_playlists_file_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("playlists").join("numberblocks.json");

        let playlists = PlaylistCatalog::from([(
            "Season 1".to_string(),
            SeasonPlaylist::new("PL123", vec![record("S01E01 One"), record("S01E02 Another One")]),
        )]);
        save_playlists(&path, &playlists).unwrap();

        let config = SeriesConfig::new("Numberblocks");
        let catalog = EpisodeCatalog::load(&config, &path).unwrap();

        assert_eq!(catalog.seasons().len(), 1);
        assert_eq!(catalog.seasons()[0].episodes[1].title, "S01E02 Another One");
        assert_eq!(playlists["Season 1"].url, "https://www.youtube.com/playlist?list=PL123");
        assert_eq!(playlists["Season 1"].episode_count, 2);
    }

    #[test]
    fn test_playlists_file_with_null_fields() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("playlists.json");
        std::fs::write(
            &path,
            r#"{
                "Season 1": {
                    "playlist_id": "PL123",
                    "url": "https://www.youtube.com/playlist?list=PL123",
                    "episode_count": 1,
                    "episodes": [
                        {"title": null, "id": "abc", "url": null, "duration": null}
                    ]
                }
            }"#,
        )
        .unwrap();

        let playlists = load_playlists(&path).unwrap().unwrap();
        let episode = &playlists["Season 1"].episodes[0];
        assert_eq!(episode.title, "");
        assert_eq!(episode.id, "abc");
        assert!(episode.url.is_none());
    }
}
