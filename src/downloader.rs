//! Episode download through yt-dlp
//!
//! The [`EpisodeDownloader`] trait is the seam between the orchestration in
//! [`crate::download_series`] and the external tool, so the orchestration can
//! run against a fake in tests.

use crate::config::SubtitleSettings;
use crate::process::{self, ProcessError};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Maximum number of characters of tool output carried in an error
const MAX_ERROR_CHARS: usize = 150;

/// Errors that can occur while downloading an episode
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The downloader program is not available
    #[error("{program} is not installed or not in PATH")]
    ToolNotInstalled { program: String },

    /// The downloader could not be run
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The downloader ran but reported a failure
    #[error("Download failed: {message}")]
    Failed { message: String },
}

/// Everything needed to download a single episode
#[derive(Debug, Clone)]
pub struct DownloadRequest<'a> {
    /// Platform video id
    pub video_id: &'a str,
    /// Target file path, including the extension
    pub output: &'a Path,
    /// Vertical resolution ceiling
    pub quality: u32,
    pub subtitles: &'a SubtitleSettings,
    /// yt-dlp download archive, if any
    pub archive: Option<&'a Path>,
    pub timeout: Option<Duration>,
}

/// Trait for anything that can fetch a single episode to disk
pub trait EpisodeDownloader {
    fn download(&self, request: &DownloadRequest<'_>) -> Result<(), DownloadError>;
}

/// Returns the watch URL for a platform video id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Downloads episodes by invoking yt-dlp, one process per episode
pub struct YtDlpDownloader {
    program: String,
}

impl YtDlpDownloader {
    /// Creates a downloader for the given program name or path
    ///
    /// Fails when the program does not answer `--version`.
    pub fn new(program: impl Into<String>) -> Result<Self, DownloadError> {
        let program = program.into();
        if !process::is_installed(&program, "--version") {
            return Err(DownloadError::ToolNotInstalled { program });
        }
        Ok(Self { program })
    }

    /// Builds the yt-dlp argument list for a request
    pub fn build_args(request: &DownloadRequest<'_>) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            format!("best[height<={}]", request.quality),
            "-o".to_string(),
            request.output.to_string_lossy().into_owned(),
        ];

        if request.subtitles.enabled {
            args.push("--write-sub".to_string());
            args.push("--sub-lang".to_string());
            args.push(request.subtitles.lang.clone());
            if request.subtitles.embed {
                args.push("--embed-subs".to_string());
            }
        }

        if let Some(archive) = request.archive {
            args.push("--download-archive".to_string());
            args.push(archive.to_string_lossy().into_owned());
        }

        args.push(watch_url(request.video_id));
        args
    }
}

impl EpisodeDownloader for YtDlpDownloader {
    fn download(&self, request: &DownloadRequest<'_>) -> Result<(), DownloadError> {
        let args = Self::build_args(request);
        debug!(video_id = request.video_id, output = %request.output.display(), "downloading episode");

        let output = process::run_tool(&self.program, &args, request.timeout)?;

        if !output.success() {
            let detail = if output.stderr.trim().is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                output.stderr
            };
            return Err(DownloadError::Failed {
                message: process::truncate_message(&detail, MAX_ERROR_CHARS),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(subtitles: &'a SubtitleSettings, archive: Option<&'a Path>) -> DownloadRequest<'a> {
        DownloadRequest {
            video_id: "abc123",
            output: Path::new("downloads/Season_1_HD/S01E01_One.mp4"),
            quality: 720,
            subtitles,
            archive,
            timeout: None,
        }
    }

    #[test]
    fn test_args_with_subtitles_and_archive() {
        let subtitles = SubtitleSettings::default();
        let archive = Path::new("downloads/series_downloaded.txt");
        let args = YtDlpDownloader::build_args(&request(&subtitles, Some(archive)));

        assert_eq!(
            args,
            vec![
                "-f",
                "best[height<=720]",
                "-o",
                "downloads/Season_1_HD/S01E01_One.mp4",
                "--write-sub",
                "--sub-lang",
                "en",
                "--embed-subs",
                "--download-archive",
                "downloads/series_downloaded.txt",
                "https://www.youtube.com/watch?v=abc123",
            ]
        );
    }

    #[test]
    fn test_args_without_subtitles() {
        let subtitles = SubtitleSettings {
            enabled: false,
            ..SubtitleSettings::default()
        };
        let args = YtDlpDownloader::build_args(&request(&subtitles, None));

        assert!(!args.iter().any(|a| a.starts_with("--write-sub")));
        assert!(!args.iter().any(|a| a == "--download-archive"));
        assert_eq!(args.last().map(String::as_str), Some("https://www.youtube.com/watch?v=abc123"));
    }

    #[test]
    fn test_args_subtitles_without_embedding() {
        let subtitles = SubtitleSettings {
            enabled: true,
            lang: "de".to_string(),
            embed: false,
        };
        let args = YtDlpDownloader::build_args(&request(&subtitles, None));

        assert!(args.windows(2).any(|w| w[0] == "--sub-lang" && w[1] == "de"));
        assert!(!args.iter().any(|a| a == "--embed-subs"));
    }

    #[test]
    fn test_missing_tool() {
        let result = YtDlpDownloader::new("definitely-not-an-installed-downloader");
        assert!(matches!(result, Err(DownloadError::ToolNotInstalled { .. })));
    }
}
