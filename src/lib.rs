//! series_downloader - Download and organize children's series from YouTube
//!
//! This library resolves season/episode numbers for catalog entries, derives
//! canonical file and directory names for them, skips episodes already on disk
//! and hands the rest to an external downloader. It also standardizes legacy
//! file names, validates downloads and post-processes subtitles.

mod config;
mod downloader;
mod episode_parser;
mod file_operations;
mod file_resolver;
mod metadata_retrieval;
mod process;
mod standardize;
mod store;
mod subtitles;
mod temp;
mod template;
mod validate;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

// Re-export error types
pub use config::ConfigError;
pub use downloader::DownloadError;
pub use file_operations::FileOperationError;
pub use file_resolver::FileResolverError;
pub use metadata_retrieval::MetadataRetrievalError;
pub use process::ProcessError;
pub use store::StoreError;
pub use subtitles::SubtitleError;
pub use template::TemplateError;

pub use config::{
    DEFAULT_CONFIG_DIR, SeriesConfig, SpacePolicy, SubtitleSettings, default_playlists_path,
    find_config, list_available_configs, load_config, resolve_config_dir,
};
pub use downloader::{DownloadRequest, EpisodeDownloader, YtDlpDownloader, watch_url};
pub use episode_parser::{EpisodeId, EpisodeRecord, parse_episode_token, resolve_episode};
pub use file_operations::{
    PlannedOperation, RenameFailure, ensure_dir, execute_renames, generate_filename,
    generate_season_dir, plan_renames, sanitize_title,
};
pub use file_resolver::{
    MediaFile, count_existing_media, episode_exists, is_canonical_filename, scan_media_files,
};
pub use metadata_retrieval::{
    EpisodeCatalog, PlaylistCatalog, PlaylistProvider, SeasonEpisodes, SeasonPlaylist,
    YtDlpPlaylistProvider, load_playlists, save_playlists,
};
pub use standardize::{FileAnalysis, StandardizationPlan, analyze_file, plan_standardization};
pub use store::JsonStore;
pub use subtitles::{ExtractionMethod, SrtReport, ffmpeg_available, verify_srt, vtt_to_srt};
pub use template::{DirectoryPattern, NamingPattern, Placeholder, Template, TemplateKind};
pub use validate::{ValidatedFile, ValidationReport, validate_downloads};

/// Why an episode was not downloaded although it resolved fine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A file for the episode already exists in its season directory
    AlreadyPresent,
    /// The downloader succeeded without writing the file (download archive hit)
    InArchive,
}

/// Progress event emitted by the long-running operations
///
/// The library never prints; callers decide what to show.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Processing of a catalog season begins
    SeasonStarted { label: String, episode_count: usize },

    /// No season/episode could be derived for a record
    EpisodeUnparseable { season_label: String, title: String },

    EpisodeSkipped {
        episode: EpisodeId,
        path: PathBuf,
        reason: SkipReason,
    },

    /// Dry run: the episode would be downloaded to `path`
    EpisodePlanned { episode: EpisodeId, path: PathBuf },

    EpisodeDownloading {
        episode: EpisodeId,
        title: String,
        path: PathBuf,
    },

    EpisodeDownloaded { episode: EpisodeId, path: PathBuf },

    EpisodeFailed {
        episode: EpisodeId,
        title: String,
        reason: String,
    },

    /// The whole catalog has been processed
    Complete {
        downloaded: usize,
        skipped: usize,
        planned: usize,
        failed: usize,
    },

    FetchingPlaylist { label: String, playlist_id: String },

    PlaylistFetched { label: String, episode_count: usize },

    /// A playlist could not be fetched; its season is stored empty
    PlaylistFailed { label: String, error: String },

    ExtractingSubtitles { video: PathBuf },

    SubtitlesExtracted {
        video: PathBuf,
        output: PathBuf,
        method: ExtractionMethod,
    },

    SubtitleExtractionFailed { video: PathBuf, error: String },
}

/// Top-level error type for series_downloader operations
#[derive(Debug, Error)]
pub enum SeriesDownloaderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("File resolution error: {0}")]
    FileResolver(#[from] FileResolverError),

    #[error("File operation error: {0}")]
    FileOperation(#[from] FileOperationError),

    #[error("Metadata retrieval error: {0}")]
    MetadataRetrieval(#[from] MetadataRetrievalError),

    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// The series config lists no playlists to fetch
    #[error("No playlists configured for {series_name}")]
    NoPlaylists { series_name: String },
}

/// Where downloads go
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Root below which season directories are created
    pub download_dir: PathBuf,
    /// yt-dlp download archive file
    pub archive_file: Option<PathBuf>,
}

/// Final state of one catalog entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EpisodeOutcome {
    Downloaded,
    Skipped { reason: SkipReason },
    /// Dry run only
    Planned,
    Failed { reason: String },
}

/// What happened to one catalog entry during a download run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeResult {
    pub season_label: String,
    pub title: String,
    pub video_id: String,
    pub episode: Option<EpisodeId>,
    pub path: Option<PathBuf>,
    #[serde(flatten)]
    pub outcome: EpisodeOutcome,
}

/// All results of a download run, in processing order
#[derive(Debug, Clone, Default)]
pub struct DownloadSummary {
    pub results: Vec<EpisodeResult>,
}

impl DownloadSummary {
    fn count(&self, predicate: impl Fn(&EpisodeOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, EpisodeOutcome::Downloaded))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, EpisodeOutcome::Skipped { .. }))
    }

    pub fn planned(&self) -> usize {
        self.count(|o| matches!(o, EpisodeOutcome::Planned))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EpisodeOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// Persisted record of a download run
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct DownloadReport {
    pub generated_at: chrono::DateTime<chrono::Local>,
    pub series_name: String,
    pub download_dir: PathBuf,
    pub downloaded: Vec<serde_json::Value>,
    pub skipped: Vec<serde_json::Value>,
    pub failed: Vec<serde_json::Value>,
}

impl DownloadReport {
    pub const FILE_NAME: &'static str = "download_report";

    /// Groups the results of a run by outcome
    pub fn from_summary(
        config: &SeriesConfig,
        options: &DownloadOptions,
        summary: &DownloadSummary,
    ) -> Result<Self, StoreError> {
        let mut downloaded = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();

        for result in &summary.results {
            let value = serde_json::to_value(result)?;
            match result.outcome {
                EpisodeOutcome::Downloaded => downloaded.push(value),
                EpisodeOutcome::Skipped { .. } => skipped.push(value),
                EpisodeOutcome::Failed { .. } => failed.push(value),
                EpisodeOutcome::Planned => {}
            }
        }

        Ok(Self {
            generated_at: chrono::Local::now(),
            series_name: config.series_name.clone(),
            download_dir: options.download_dir.clone(),
            downloaded,
            skipped,
            failed,
        })
    }

    /// Writes the report into the download root
    pub fn save(&self) -> Result<PathBuf, StoreError> {
        JsonStore::<Self>::open(&self.download_dir)?.store(Self::FILE_NAME, self)
    }
}

/// Downloads every catalog episode that is not yet on disk
///
/// Episodes are handled strictly one after another: resolve the identifier,
/// derive the target path, skip if any file in the season directory already
/// holds the episode, otherwise create the directory and invoke the downloader.
/// A failure only affects its own episode.
///
/// Passing `None` as downloader performs a dry run: nothing is created and
/// missing episodes are reported as planned.
///
/// # Examples
///
/// ```no_run
/// use series_downloader::{
///     DownloadOptions, EpisodeCatalog, ProgressEvent, SeriesConfig, YtDlpDownloader,
///     download_series,
/// };
/// use std::path::{Path, PathBuf};
///
/// let config = SeriesConfig::new("Numberblocks");
/// let catalog = EpisodeCatalog::load(&config, Path::new("numberblocks.json")).unwrap();
/// let downloader = YtDlpDownloader::new("yt-dlp").unwrap();
/// let options = DownloadOptions {
///     download_dir: PathBuf::from("downloads"),
///     archive_file: None,
/// };
///
/// let summary = download_series(&config, &catalog, &options, Some(&downloader), |event| {
///     if let ProgressEvent::EpisodeDownloaded { episode, .. } = event {
///         println!("{}", episode);
///     }
/// });
/// println!("{} failed", summary.failed());
/// ```
pub fn download_series<F>(
    config: &SeriesConfig,
    catalog: &EpisodeCatalog,
    options: &DownloadOptions,
    downloader: Option<&dyn EpisodeDownloader>,
    mut progress_callback: F,
) -> DownloadSummary
where
    F: FnMut(ProgressEvent),
{
    let extension = &config.media_extension;
    let mut summary = DownloadSummary::default();

    for season in catalog.seasons() {
        progress_callback(ProgressEvent::SeasonStarted {
            label: season.label.clone(),
            episode_count: season.episodes.len(),
        });

        for record in &season.episodes {
            let mut result = EpisodeResult {
                season_label: season.label.clone(),
                title: record.title.clone(),
                video_id: record.id.clone(),
                episode: None,
                path: None,
                outcome: EpisodeOutcome::Planned,
            };

            let Some(id) = resolve_episode(record) else {
                warn!(title = %record.title, "cannot parse episode identifier");
                progress_callback(ProgressEvent::EpisodeUnparseable {
                    season_label: season.label.clone(),
                    title: record.title.clone(),
                });
                result.outcome = EpisodeOutcome::Failed {
                    reason: "cannot parse episode identifier".to_string(),
                };
                summary.results.push(result);
                continue;
            };

            let season_dir = generate_season_dir(
                &options.download_dir,
                &config.series_name,
                id.season,
                config,
                &season.label,
            );
            let file_name = generate_filename(config, id.season, id.episode, &record.title);
            let path = season_dir.join(file_name);
            result.episode = Some(id);
            result.path = Some(path.clone());

            let present =
                path.exists() || episode_exists(&season_dir, id.season, id.episode, extension);

            result.outcome = if present {
                progress_callback(ProgressEvent::EpisodeSkipped {
                    episode: id,
                    path,
                    reason: SkipReason::AlreadyPresent,
                });
                EpisodeOutcome::Skipped {
                    reason: SkipReason::AlreadyPresent,
                }
            } else if let Some(downloader) = downloader {
                let target = EpisodeTarget {
                    record,
                    id,
                    season_dir,
                    path,
                };
                download_episode(downloader, config, options, target, &mut progress_callback)
            } else {
                progress_callback(ProgressEvent::EpisodePlanned { episode: id, path });
                EpisodeOutcome::Planned
            };

            summary.results.push(result);
        }
    }

    progress_callback(ProgressEvent::Complete {
        downloaded: summary.downloaded(),
        skipped: summary.skipped(),
        planned: summary.planned(),
        failed: summary.failed(),
    });

    summary
}

/// Target of a single download, resolved by [`download_series`]
struct EpisodeTarget<'a> {
    record: &'a EpisodeRecord,
    id: EpisodeId,
    season_dir: PathBuf,
    path: PathBuf,
}

fn download_episode<F>(
    downloader: &dyn EpisodeDownloader,
    config: &SeriesConfig,
    options: &DownloadOptions,
    target: EpisodeTarget<'_>,
    progress_callback: &mut F,
) -> EpisodeOutcome
where
    F: FnMut(ProgressEvent),
{
    let id = target.id;
    let title = target.record.title.clone();

    match try_download_episode(downloader, config, options, target, progress_callback) {
        Ok(outcome) => outcome,
        Err(reason) => {
            warn!(episode = %id, %reason, "episode failed");
            progress_callback(ProgressEvent::EpisodeFailed {
                episode: id,
                title,
                reason: reason.clone(),
            });
            EpisodeOutcome::Failed { reason }
        }
    }
}

fn try_download_episode<F>(
    downloader: &dyn EpisodeDownloader,
    config: &SeriesConfig,
    options: &DownloadOptions,
    target: EpisodeTarget<'_>,
    progress_callback: &mut F,
) -> Result<EpisodeOutcome, String>
where
    F: FnMut(ProgressEvent),
{
    let EpisodeTarget {
        record,
        id,
        season_dir,
        path,
    } = target;

    ensure_dir(&season_dir).map_err(|e| e.to_string())?;

    progress_callback(ProgressEvent::EpisodeDownloading {
        episode: id,
        title: record.title.clone(),
        path: path.clone(),
    });

    let request = DownloadRequest {
        video_id: &record.id,
        output: &path,
        quality: config.quality,
        subtitles: &config.subtitles,
        archive: options.archive_file.as_deref(),
        timeout: config.download_timeout_secs.map(Duration::from_secs),
    };
    downloader.download(&request).map_err(|e| e.to_string())?;

    if path.exists() {
        progress_callback(ProgressEvent::EpisodeDownloaded { episode: id, path });
        return Ok(EpisodeOutcome::Downloaded);
    }

    debug!(episode = %id, "downloader finished without writing a file");
    progress_callback(ProgressEvent::EpisodeSkipped {
        episode: id,
        path,
        reason: SkipReason::InArchive,
    });
    Ok(EpisodeOutcome::Skipped {
        reason: SkipReason::InArchive,
    })
}

/// Fetches every configured playlist into a playlists catalog
///
/// A playlist that cannot be fetched is stored as an empty season and
/// reported through [`ProgressEvent::PlaylistFailed`].
pub fn fetch_playlists<F>(
    config: &SeriesConfig,
    provider: &dyn PlaylistProvider,
    mut progress_callback: F,
) -> Result<PlaylistCatalog, SeriesDownloaderError>
where
    F: FnMut(ProgressEvent),
{
    let playlists = config
        .playlists
        .as_ref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| SeriesDownloaderError::NoPlaylists {
            series_name: config.series_name.clone(),
        })?;

    let mut catalog = PlaylistCatalog::new();

    for (label, playlist_id) in playlists {
        progress_callback(ProgressEvent::FetchingPlaylist {
            label: label.clone(),
            playlist_id: playlist_id.clone(),
        });

        let episodes = match provider.fetch_playlist(playlist_id) {
            Ok(episodes) => {
                progress_callback(ProgressEvent::PlaylistFetched {
                    label: label.clone(),
                    episode_count: episodes.len(),
                });
                episodes
            }
            Err(e) => {
                warn!(%label, %playlist_id, error = %e, "playlist fetch failed");
                progress_callback(ProgressEvent::PlaylistFailed {
                    label: label.clone(),
                    error: e.to_string(),
                });
                Vec::new()
            }
        };

        catalog.insert(label.clone(), SeasonPlaylist::new(playlist_id, episodes));
    }

    Ok(catalog)
}

/// Outcome of a subtitle extraction run over one season directory
#[derive(Debug, Default)]
pub struct SubtitleSummary {
    pub extracted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Extracts subtitles for every media file in a season directory
///
/// Requires ffmpeg. Output files are named after the video with an `.srt`
/// extension and placed in `output_dir`, which is created if needed.
pub fn extract_season_subtitles<F>(
    season_dir: &Path,
    output_dir: &Path,
    extension: &str,
    mut progress_callback: F,
) -> Result<SubtitleSummary, SeriesDownloaderError>
where
    F: FnMut(ProgressEvent),
{
    if !ffmpeg_available() {
        return Err(SubtitleError::FfmpegNotInstalled.into());
    }

    let videos = scan_media_files(season_dir, extension)?;
    ensure_dir(output_dir)?;

    let mut summary = SubtitleSummary::default();

    for video in videos {
        progress_callback(ProgressEvent::ExtractingSubtitles {
            video: video.path.clone(),
        });

        match subtitles::extract_subtitles(&video.path, output_dir) {
            Ok((output, method)) => {
                progress_callback(ProgressEvent::SubtitlesExtracted {
                    video: video.path.clone(),
                    output: output.clone(),
                    method,
                });
                summary.extracted.push(output);
            }
            Err(e) => {
                progress_callback(ProgressEvent::SubtitleExtractionFailed {
                    video: video.path.clone(),
                    error: e.to_string(),
                });
                summary.failed.push((video.path, e.to_string()));
            }
        }
    }

    Ok(summary)
}

/// Verifies every `.srt` file directly inside a directory
pub fn verify_subtitle_dir(dir: &Path) -> Result<Vec<(PathBuf, SrtReport)>, SeriesDownloaderError> {
    let mut reports = Vec::new();

    for file in scan_media_files(dir, "srt")? {
        let report = match subtitles::verify_srt_file(&file.path) {
            Ok(report) => report,
            Err(e) => SrtReport {
                issues: vec![e.to_string()],
                ..SrtReport::default()
            },
        };
        reports.push((file.path, report));
    }

    Ok(reports)
}
