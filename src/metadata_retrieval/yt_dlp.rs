/// Playlist provider backed by yt-dlp.
use super::yt_dlp_types::FlatPlaylistEntry;
use super::{MetadataRetrievalError, PlaylistProvider, playlist_url};
use crate::episode_parser::EpisodeRecord;
use crate::process;
use std::time::Duration;
use tracing::debug;

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ERROR_CHARS: usize = 150;

/// Lists playlist entries by running `yt-dlp --dump-json --flat-playlist`.
///
/// Only metadata is fetched, no media is downloaded.
pub struct YtDlpPlaylistProvider {
    program: String,
    timeout: Duration,
}

impl YtDlpPlaylistProvider {
    /// Creates a provider for the given program name or path
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: FETCH_TIMEOUT,
        }
    }

    /// Checks if the program answers `--version`
    pub fn is_available(&self) -> bool {
        process::is_installed(&self.program, "--version")
    }
}

impl PlaylistProvider for YtDlpPlaylistProvider {
    fn fetch_playlist(&self, playlist_id: &str) -> Result<Vec<EpisodeRecord>, MetadataRetrievalError> {
        let args = vec![
            "--dump-json".to_string(),
            "--flat-playlist".to_string(),
            playlist_url(playlist_id),
        ];

        let output = process::run_tool(&self.program, &args, Some(self.timeout))
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        // yt-dlp exits non-zero when some entries are unavailable but still
        // prints the rest, so only fail when nothing came back
        if !output.success() && output.stdout.trim().is_empty() {
            return Err(MetadataRetrievalError::RequestError(process::truncate_message(
                &output.stderr,
                MAX_ERROR_CHARS,
            )));
        }

        parse_flat_playlist(&output.stdout)
    }
}

/// Parses flat playlist output, one JSON object per line
///
/// Blank lines are ignored and entries without an id are skipped. A line that
/// is not valid JSON fails the whole parse.
pub fn parse_flat_playlist(output: &str) -> Result<Vec<EpisodeRecord>, MetadataRetrievalError> {
    let mut episodes = Vec::new();

    for (index, line) in output.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let entry: FlatPlaylistEntry = serde_json::from_str(line).map_err(|e| {
            MetadataRetrievalError::ParseError(format!("line {}: {}", index + 1, e))
        })?;

        let Some(id) = entry.id else {
            debug!(line = index + 1, "skipping playlist entry without id");
            continue;
        };

        episodes.push(EpisodeRecord {
            title: entry.title.unwrap_or_default(),
            id,
            season: None,
            episode: None,
            url: entry.webpage_url.or(entry.url),
            duration: entry.duration,
        });
    }

    Ok(episodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_playlist() {
        let output = r#"{"id": "a1", "title": "S01E01 One | Full Episode", "url": "https://www.youtube.com/watch?v=a1", "duration": 301.0, "ie_key": "Youtube"}
{"id": "b2", "title": "S01E02 Another One", "webpage_url": "https://www.youtube.com/watch?v=b2", "duration": null}

"#;

        let episodes = parse_flat_playlist(output).unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].id, "a1");
        assert_eq!(episodes[0].title, "S01E01 One | Full Episode");
        assert_eq!(episodes[0].url.as_deref(), Some("https://www.youtube.com/watch?v=a1"));
        assert_eq!(episodes[0].duration, Some(301.0));
        assert_eq!(episodes[1].url.as_deref(), Some("https://www.youtube.com/watch?v=b2"));
        assert!(episodes[1].duration.is_none());
    }

    #[test]
    fn test_entries_without_id_are_skipped() {
        let output = r#"{"title": "[Private video]"}
{"id": "c3", "title": null}"#;

        let episodes = parse_flat_playlist(output).unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].id, "c3");
        assert_eq!(episodes[0].title, "");
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_flat_playlist("").unwrap().is_empty());
        assert!(parse_flat_playlist("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_json_line() {
        let result = parse_flat_playlist("{\"id\": \"a1\"}\nnot json");
        match result {
            Err(MetadataRetrievalError::ParseError(message)) => assert!(message.starts_with("line 2:")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
