use crate::config::SeriesConfig;
use crate::episode_parser::EpisodeId;
use crate::template::TemplateValues;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Anything that is not a word character, whitespace or hyphen
static STRIPPED_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static WHITESPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static UNDERSCORE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());

/// A redundant `S01E01` token at the start of a title, with its trailing separators
static LEADING_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*s\d+\s*e\d+[\s\-_|:.]*").unwrap());

/// Errors that can occur during file operations
#[derive(Debug, Error)]
pub enum FileOperationError {
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed { path: PathBuf, source: io::Error },
}

/// Represents a planned rename of a media file
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOperation {
    /// Current file path
    pub source: PathBuf,
    /// New file path, in the same directory as the source
    pub destination: PathBuf,
    /// Episode encoded in the new name
    pub episode: EpisodeId,
    /// Collision suffix applied (if any)
    pub duplicate_suffix: Option<usize>,
}

/// A rename that could not be carried out
#[derive(Debug)]
pub struct RenameFailure {
    pub operation: PlannedOperation,
    pub error: io::Error,
}

/// Reduces a title to a filesystem-safe token
///
/// - Removes every character that is not a letter, digit, underscore,
///   whitespace or hyphen (punctuation and emoji are deleted, not replaced)
/// - Turns each whitespace run into a single underscore
/// - Collapses underscore runs and trims underscores from both ends
///
/// The result may be empty.
pub fn sanitize_title(title: &str) -> String {
    let stripped = STRIPPED_CHARS_RE.replace_all(title, "");
    let underscored = WHITESPACE_RUN_RE.replace_all(&stripped, "_");
    let collapsed = UNDERSCORE_RUN_RE.replace_all(&underscored, "_");
    collapsed.trim_matches('_').to_string()
}

/// Removes a leading `S<n>E<n>` token that would duplicate the generated prefix
pub fn strip_leading_episode_token(title: &str) -> &str {
    match LEADING_TOKEN_RE.find(title) {
        Some(m) => &title[m.end()..],
        None => title,
    }
}

/// Generates the file name for an episode
///
/// The title loses any leading episode token, is sanitized, and is then
/// substituted together with the numbers into the series naming pattern.
/// Zero-padding is controlled by the pattern. An empty sanitized title is
/// still substituted.
///
/// # Examples
///
/// ```
/// use series_downloader::{SeriesConfig, generate_filename};
///
/// let config = SeriesConfig::new("Numberblocks");
/// assert_eq!(generate_filename(&config, 1, 1, "S01E01 One"), "S01E01_One.mp4");
/// ```
pub fn generate_filename(config: &SeriesConfig, season: u32, episode: u32, title: &str) -> String {
    let clean_title = sanitize_title(strip_leading_episode_token(title));

    config.naming_pattern.template().render(&TemplateValues {
        season: Some(season),
        episode: Some(episode),
        title: Some(&clean_title),
        ..Default::default()
    })
}

/// Computes the season directory for an episode below the download root
///
/// Spaces in the series name are handled according to the config's
/// `series_name_spaces` policy. No directory is created here.
pub fn generate_season_dir(
    download_root: &Path,
    series_name: &str,
    season: u32,
    config: &SeriesConfig,
    season_label: &str,
) -> PathBuf {
    let series_name = config.series_name_spaces.apply(series_name);

    let dir_name = config.directory_pattern.template().render(&TemplateValues {
        season: Some(season),
        series_name: Some(&series_name),
        season_name: Some(season_label),
        ..Default::default()
    });

    download_root.join(dir_name)
}

/// Creates a directory and all of its parents
///
/// Succeeds if the directory already exists.
pub fn ensure_dir(path: &Path) -> Result<(), FileOperationError> {
    fs::create_dir_all(path).map_err(|e| FileOperationError::DirectoryCreationFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Appends a collision suffix before the extension: `name.ext` -> `name_2.ext`
fn with_duplicate_suffix(file_name: &str, suffix: usize) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => {
            format!("{}_{}.{}", stem, suffix, extension)
        }
        _ => format!("{}_{}", file_name, suffix),
    }
}

/// Plans renames for a batch of files, resolving name collisions
///
/// Each entry is `(source, episode, proposed file name)`. A proposed name that
/// is already taken by another file in the same directory, or by an earlier
/// entry of the batch, gets a numeric suffix starting from 2:
/// - First occurrence: `S01E01_Title.mp4`
/// - Second occurrence: `S01E01_Title_2.mp4`
/// - Third occurrence: `S01E01_Title_3.mp4`
pub fn plan_renames(
    candidates: &[(PathBuf, EpisodeId, String)],
) -> Result<Vec<PlannedOperation>, FileOperationError> {
    let mut taken: HashSet<PathBuf> = HashSet::new();
    let mut scanned: HashSet<PathBuf> = HashSet::new();
    let sources: HashSet<&Path> = candidates.iter().map(|(s, _, _)| s.as_path()).collect();

    let mut operations = Vec::new();

    for (source, episode, proposed) in candidates {
        let directory = source.parent().unwrap_or(Path::new("")).to_path_buf();

        // Existing files count as taken unless they are about to be renamed
        if scanned.insert(directory.clone()) && directory.is_dir() {
            let entries = fs::read_dir(&directory).map_err(|e| {
                FileOperationError::ReadDirectoryFailed {
                    path: directory.clone(),
                    source: e,
                }
            })?;
            for entry in entries.flatten() {
                let path = entry.path();
                if !sources.contains(path.as_path()) {
                    taken.insert(path);
                }
            }
        }

        let mut destination = directory.join(proposed);
        let mut duplicate_suffix = None;
        let mut counter = 2;
        while taken.contains(&destination) {
            destination = directory.join(with_duplicate_suffix(proposed, counter));
            duplicate_suffix = Some(counter);
            counter += 1;
        }

        if duplicate_suffix.is_some() {
            debug!(
                source = %source.display(),
                destination = %destination.display(),
                "name collision resolved with suffix"
            );
        }

        taken.insert(destination.clone());
        operations.push(PlannedOperation {
            source: source.clone(),
            destination,
            episode: *episode,
            duplicate_suffix,
        });
    }

    Ok(operations)
}

/// Executes rename operations in place
///
/// Never overwrites: a destination that appeared since planning is reported as
/// a failure. Every operation is attempted; failures are returned.
pub fn execute_renames(operations: &[PlannedOperation]) -> Vec<RenameFailure> {
    let mut failures = Vec::new();

    for op in operations {
        let result = if op.destination.exists() {
            Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", op.destination.display()),
            ))
        } else {
            fs::rename(&op.source, &op.destination)
        };

        if let Err(error) = result {
            failures.push(RenameFailure {
                operation: op.clone(),
                error,
            });
        }
    }

    failures
}
