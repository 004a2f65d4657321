//! Filename standardization
//!
//! Brings media files that were downloaded under older or inconsistent naming
//! schemes (`S8E01_Title.mp4`, `Title_S3E14.mp4`, `SP01_Title.mp4`,
//! `S01E01 - Title ｜ Full Episode.mp4`) into the canonical
//! `S01E01_Title.ext` form.

use crate::config::SeriesConfig;
use crate::episode_parser::{EpisodeId, parse_number};
use crate::file_operations::{PlannedOperation, plan_renames, sanitize_title};
use crate::file_resolver::{
    is_canonical_filename, is_partial_download, list_subdirectories, scan_media_files,
};
use crate::SeriesDownloaderError;
use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static LEADING_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^s(\d+)e(\d+)").unwrap());
static ANY_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)s(\d+)e(\d+)").unwrap());
static SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)sp(\d+)").unwrap());

/// Video-platform suffixes, everything from the match onwards is dropped
static SUFFIX_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\s*[｜|]\s*Full Episode",
        r"(?i)\s*-\s*Full Episode",
        r"(?i)\s*[｜|]\s*S\d+\s*E\d+",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static TRAILING_PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*$").unwrap());

/// Outcome of looking at a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAnalysis {
    AlreadyCanonical,
    /// An interrupted download left by the downloader
    PartialDownload,
    /// No episode token could be found in the name
    Unrecognized,
    /// Standardizing would produce the same name
    Unchanged,
    Rename { episode: EpisodeId, new_name: String },
}

/// Files to rename below a download root, plus what was left alone
#[derive(Debug, Default)]
pub struct StandardizationPlan {
    pub operations: Vec<PlannedOperation>,
    pub unrecognized: Vec<PathBuf>,
    pub already_canonical: usize,
    pub partial_downloads: usize,
}

/// Finds the episode token in a file stem
///
/// A token at the very start wins. Otherwise the last `S<n>E<n>` token in the
/// name is used, and failing that an `SP<n>` token, which denotes special `n`
/// (season 0). Returns the identifier and the byte range of the token.
pub fn extract_episode_from_filename(stem: &str) -> Option<(EpisodeId, Range<usize>)> {
    let captures = LEADING_ID_RE
        .captures(stem)
        .or_else(|| ANY_ID_RE.captures_iter(stem).last());

    if let Some(captures) = captures {
        let token = captures.get(0)?;
        let id = EpisodeId::new(parse_number(&captures[1])?, parse_number(&captures[2])?);
        return Some((id, token.range()));
    }

    let captures = SPECIAL_RE.captures(stem)?;
    let token = captures.get(0)?;
    Some((EpisodeId::new(0, parse_number(&captures[1])?), token.range()))
}

/// Cleans the title part of a file name
///
/// Platform suffixes (`| Full Episode`, `- Full Episode`, `| S1 E1`,
/// `| <series name>`, `| @<series name>`) are cut off together with everything
/// after them, as is a trailing parenthetical. Dashes become underscores and
/// the result is sanitized.
pub fn clean_title(title: &str, series_name: &str) -> String {
    let series_suffix = Regex::new(&format!(
        r"(?i)\s*[｜|]\s*@?{}",
        regex::escape(series_name)
    ))
    .ok();

    let cut = SUFFIX_RES
        .iter()
        .chain(series_suffix.as_ref())
        .filter_map(|re| re.find(title))
        .map(|m| m.start())
        .min()
        .unwrap_or(title.len());

    let title = TRAILING_PARENTHETICAL_RE.replace(&title[..cut], "");
    let title = title.replace(['-', '–', '—', '｜'], "_");

    sanitize_title(&title)
}

/// Builds the canonical name for an episode and a cleaned title
///
/// Without a title the name is just the identifier.
pub fn standardized_name(episode: EpisodeId, title: &str, extension: &str) -> String {
    if title.is_empty() {
        format!("{}.{}", episode, extension)
    } else {
        format!("{}_{}.{}", episode, title, extension)
    }
}

/// Decides what to do with one media file name
pub fn analyze_file(file_name: &str, config: &SeriesConfig) -> FileAnalysis {
    let extension = &config.media_extension;

    if is_partial_download(file_name) {
        return FileAnalysis::PartialDownload;
    }
    if is_canonical_filename(file_name, extension) {
        return FileAnalysis::AlreadyCanonical;
    }

    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);

    let Some((episode, token)) = extract_episode_from_filename(stem) else {
        return FileAnalysis::Unrecognized;
    };

    let remainder = format!("{}{}", &stem[..token.start], &stem[token.end..]);
    let title = clean_title(&remainder, &config.series_name);
    let new_name = standardized_name(episode, &title, extension);

    if new_name == file_name {
        FileAnalysis::Unchanged
    } else {
        FileAnalysis::Rename { episode, new_name }
    }
}

/// Plans standardization for every season directory below the download root
///
/// Only immediate subdirectories are scanned. Nothing is renamed here; pass
/// the operations to [`crate::file_operations::execute_renames`].
pub fn plan_standardization(
    download_root: &Path,
    config: &SeriesConfig,
) -> Result<StandardizationPlan, SeriesDownloaderError> {
    let mut plan = StandardizationPlan::default();
    let mut candidates = Vec::new();

    for dir in list_subdirectories(download_root)? {
        for file in scan_media_files(&dir, &config.media_extension)? {
            match analyze_file(&file.file_name(), config) {
                FileAnalysis::AlreadyCanonical => plan.already_canonical += 1,
                FileAnalysis::PartialDownload => plan.partial_downloads += 1,
                FileAnalysis::Unrecognized => plan.unrecognized.push(file.path),
                FileAnalysis::Unchanged => {}
                FileAnalysis::Rename { episode, new_name } => {
                    candidates.push((file.path, episode, new_name));
                }
            }
        }
    }

    plan.operations = plan_renames(&candidates)?;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_operations::execute_renames;
    use std::fs;
    use tempfile::TempDir;

    fn config() -> SeriesConfig {
        SeriesConfig::new("Numberblocks")
    }

    fn rename_target(file_name: &str) -> Option<String> {
        match analyze_file(file_name, &config()) {
            FileAnalysis::Rename { new_name, .. } => Some(new_name),
            _ => None,
        }
    }

    #[test]
    fn test_extract_leading_token() {
        let (id, range) = extract_episode_from_filename("S8E01_Title").unwrap();
        assert_eq!(id, EpisodeId::new(8, 1));
        assert_eq!(range, 0..5);
    }

    #[test]
    fn test_extract_last_token() {
        let (id, _) = extract_episode_from_filename("Title_S1E2_Remix_S3E14").unwrap();
        assert_eq!(id, EpisodeId::new(3, 14));
    }

    #[test]
    fn test_extract_special() {
        let (id, range) = extract_episode_from_filename("SP04_Double_Back").unwrap();
        assert_eq!(id, EpisodeId::new(0, 4));
        assert_eq!(range, 0..4);
    }

    #[test]
    fn test_extract_fullwidth_digits() {
        let (id, _) = extract_episode_from_filename("S３E１４_Title").unwrap();
        assert_eq!(id, EpisodeId::new(3, 14));
        assert_eq!(rename_target("S３E１４_Title.mp4").as_deref(), Some("S03E14_Title.mp4"));
    }

    #[test]
    fn test_extract_nothing() {
        assert!(extract_episode_from_filename("Holiday Special").is_none());
    }

    #[test]
    fn test_clean_title_suffixes() {
        assert_eq!(clean_title("One ｜ Full Episode - S1 E1", "Numberblocks"), "One");
        assert_eq!(clean_title("Two - Full Episode", "Numberblocks"), "Two");
        assert_eq!(clean_title("Three | S1 E3 | Learn to Count", "Numberblocks"), "Three");
        assert_eq!(clean_title("Four | @Numberblocks", "Numberblocks"), "Four");
        assert_eq!(clean_title("Five ｜ numberblocks ｜ Maths", "Numberblocks"), "Five");
        assert_eq!(clean_title("Six (Clip)", "Numberblocks"), "Six");
    }

    #[test]
    fn test_clean_title_dashes_and_emoji() {
        assert_eq!(clean_title("Ten – Again 🚀", "Numberblocks"), "Ten_Again");
        assert_eq!(clean_title("_Title", "Numberblocks"), "Title");
    }

    #[test]
    fn test_analyze_renames() {
        assert_eq!(rename_target("S8E01_Title.mp4").as_deref(), Some("S08E01_Title.mp4"));
        assert_eq!(rename_target("Title_S3E14.mp4").as_deref(), Some("S03E14_Title.mp4"));
        assert_eq!(rename_target("S01E12-Title.mp4").as_deref(), Some("S01E12_Title.mp4"));
        assert_eq!(rename_target("SP01_Double.mp4").as_deref(), Some("S00E01_Double.mp4"));
        assert_eq!(
            rename_target("S01E01_One ｜ Full Episode.mp4").as_deref(),
            Some("S01E01_One.mp4")
        );
    }

    #[test]
    fn test_analyze_skips() {
        let config = config();
        assert_eq!(analyze_file("S01E01_One.mp4", &config), FileAnalysis::AlreadyCanonical);
        assert_eq!(analyze_file("S01E01_One.part.mp4", &config), FileAnalysis::PartialDownload);
        assert_eq!(analyze_file("Holiday.mp4", &config), FileAnalysis::Unrecognized);
        assert_eq!(analyze_file("S01E01.mp4", &config), FileAnalysis::Unchanged);
    }

    #[test]
    fn test_plan_and_execute() {
        let temp = TempDir::new().unwrap();
        let season = temp.path().join("Season_1_HD");
        fs::create_dir(&season).unwrap();
        for name in [
            "S01E01_One.mp4",
            "S1E1-One.mp4",
            "Two_S1E2.mp4",
            "Holiday.mp4",
            "notes.txt",
        ] {
            fs::write(season.join(name), b"data").unwrap();
        }
        fs::write(temp.path().join("S9E9_Stray.mp4"), b"data").unwrap();

        let plan = plan_standardization(temp.path(), &config()).unwrap();
        assert_eq!(plan.already_canonical, 1);
        assert_eq!(plan.unrecognized, vec![season.join("Holiday.mp4")]);
        assert_eq!(plan.operations.len(), 2);

        let collided = plan
            .operations
            .iter()
            .find(|op| op.source.ends_with("S1E1-One.mp4"))
            .unwrap();
        assert_eq!(collided.destination, season.join("S01E01_One_2.mp4"));

        assert!(execute_renames(&plan.operations).is_empty());
        assert!(season.join("S01E01_One_2.mp4").exists());
        assert!(season.join("S01E02_Two.mp4").exists());
        assert!(!season.join("Two_S1E2.mp4").exists());
        assert!(temp.path().join("S9E9_Stray.mp4").exists());
    }

    #[test]
    fn test_plan_missing_root() {
        let temp = TempDir::new().unwrap();
        assert!(plan_standardization(&temp.path().join("missing"), &config()).is_err());
    }
}
