/// yt-dlp `--dump-json --flat-playlist` output types for deserialization.
///
/// Each line of output is one JSON object describing a playlist entry. Only the
/// fields we use are listed; everything else is ignored.
use serde::Deserialize;

/// A single entry of a flat playlist dump.
#[derive(Debug, Deserialize)]
pub(super) struct FlatPlaylistEntry {
    /// Video id (missing for unavailable entries)
    pub id: Option<String>,
    /// Video title (may be null for private or deleted videos)
    pub title: Option<String>,
    /// Canonical watch page URL
    pub webpage_url: Option<String>,
    /// Fallback URL used by some extractors instead of `webpage_url`
    pub url: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
}
