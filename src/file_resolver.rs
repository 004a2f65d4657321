//! File resolver module for season directories
//!
//! This module scans season directories for downloaded media files and answers
//! the two filename questions the rest of the crate asks:
//!
//! - does *any* file in a directory already hold a given episode? (loose)
//! - is a file name already in the canonical `S01E01_Title.ext` form? (strict)
//!
//! The two checks are deliberately separate predicates.

use crate::episode_parser::{EpisodeId, parse_number};
use crate::file_operations::sanitize_title;
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

/// `S<n>E<n>` anywhere in a file name, any case, no separator between the parts
static FILENAME_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)s(\d+)e(\d+)").unwrap());

/// `S01E01_<title>.<ext>` anchored at both ends
static CANONICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^S([0-9]{2})E([0-9]{2})_(.+)\.([^.]+)$").unwrap());

/// Errors that can occur during file resolution
#[derive(Debug, Error)]
pub enum FileResolverError {
    /// Path is not a directory
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Failed to read directory
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed { path: PathBuf, source: io::Error },

    /// Failed to read directory entry
    #[error("Failed to read directory entry: {0}")]
    ReadEntryFailed(#[from] io::Error),
}

/// Represents a media file found in a season directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Path to the media file
    pub path: PathBuf,
}

impl MediaFile {
    /// The file name as UTF-8, lossily converted
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Returns true if the file name ends in `.<extension>`, ignoring case
pub fn has_media_extension(file_name: &str, extension: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(extension))
}

/// Returns true for yt-dlp leftovers of interrupted downloads
pub fn is_partial_download(file_name: &str) -> bool {
    file_name.contains(".part") || file_name.contains(".ytdl")
}

/// Lists the media files directly inside a directory
///
/// The scan is not recursive. Results are sorted by file name.
pub fn scan_media_files(dir_path: &Path, extension: &str) -> Result<Vec<MediaFile>, FileResolverError> {
    if !dir_path.is_dir() {
        return Err(FileResolverError::NotADirectory(dir_path.to_path_buf()));
    }

    let mut media_files = Vec::new();

    for entry in fs::read_dir(dir_path).map_err(|e| FileResolverError::ReadDirectoryFailed {
        path: dir_path.to_path_buf(),
        source: e,
    })? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| has_media_extension(name, extension));

        if matches {
            media_files.push(MediaFile { path });
        }
    }

    media_files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(media_files)
}

/// Lists the immediate subdirectories of a directory, sorted
pub fn list_subdirectories(dir_path: &Path) -> Result<Vec<PathBuf>, FileResolverError> {
    if !dir_path.is_dir() {
        return Err(FileResolverError::NotADirectory(dir_path.to_path_buf()));
    }

    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir_path).map_err(|e| FileResolverError::ReadDirectoryFailed {
        path: dir_path.to_path_buf(),
        source: e,
    })? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }

    dirs.sort();
    Ok(dirs)
}

/// Counts media files in all immediate subdirectories of the download root
///
/// A missing root counts as zero.
pub fn count_existing_media(download_root: &Path, extension: &str) -> usize {
    let Ok(dirs) = list_subdirectories(download_root) else {
        return 0;
    };

    dirs.iter()
        .filter_map(|dir| scan_media_files(dir, extension).ok())
        .map(|files| files.len())
        .sum()
}

/// Extracts the first `S<n>E<n>` token from a file name
pub fn episode_token_in_filename(file_name: &str) -> Option<EpisodeId> {
    let captures = FILENAME_TOKEN_RE.captures(file_name)?;
    Some(EpisodeId {
        season: parse_number(&captures[1])?,
        episode: parse_number(&captures[2])?,
    })
}

/// Checks whether a season directory already holds an episode, in any naming
///
/// Every media file whose name embeds `S<n>E<n>` with the same numbers counts,
/// whatever the padding or separators (`S01E01-Title.mp4`, `S1E1_Title.mp4`,
/// `Title_S01E01.mp4`). A missing directory means "not found" and is never
/// created.
pub fn episode_exists(season_dir: &Path, season: u32, episode: u32, extension: &str) -> bool {
    if !season_dir.exists() {
        return false;
    }

    let files = match scan_media_files(season_dir, extension) {
        Ok(files) => files,
        Err(e) => {
            warn!(dir = %season_dir.display(), error = %e, "cannot scan season directory");
            return false;
        }
    };

    let wanted = EpisodeId { season, episode };
    files
        .iter()
        .any(|file| episode_token_in_filename(&file.file_name()) == Some(wanted))
}

/// Checks whether a file name is already in canonical form
///
/// Canonical means `S<2 digits>E<2 digits>_<title>.<extension>` from the very
/// start of the name, with a non-empty title that is already sanitized and does
/// not begin with an underscore. Stray suffixes, symbols or a different
/// extension make the name non-canonical.
pub fn is_canonical_filename(file_name: &str, extension: &str) -> bool {
    let Some(captures) = CANONICAL_RE.captures(file_name) else {
        return false;
    };

    let title = &captures[3];
    &captures[4] == extension && !title.starts_with('_') && sanitize_title(title) == title
}

/// Analyzes a file to determine if its content is a video
///
/// Only reads the first 8KB of the file.
pub fn is_video_content(file_path: &Path) -> bool {
    const BUFFER_SIZE: usize = 8192;

    let Ok(mut file) = File::open(file_path) else {
        return false;
    };

    let mut buffer = vec![0u8; BUFFER_SIZE];
    let Ok(bytes_read) = file.read(&mut buffer) else {
        return false;
    };
    buffer.truncate(bytes_read);

    infer::is_video(&buffer)
}
