//! Episode identifier parsing
//!
//! This module resolves the season/episode pair of an episode record, either
//! from the record's explicit fields or from an `S<n>E<n>` token embedded in
//! its title.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// `S1E1`, `S01 E01`, `s2e15`, anywhere in the text
static TITLE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)s(\d+)\s*e(\d+)").unwrap());

static DECIMAL_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d$").unwrap());

/// A single source video as listed in a series catalog
///
/// Explicit `season`/`episode` fields take precedence over anything encoded
/// in the title. `url` and `duration` are informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Human-readable title, may embed an `S<n>E<n>` token
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    /// Opaque platform video identifier
    pub id: String,
    /// Explicit season override (0 denotes specials)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    /// Explicit episode override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl EpisodeRecord {
    /// Creates a record with only a title and a video id
    pub fn new(title: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: id.into(),
            season: None,
            episode: None,
            url: None,
            duration: None,
        }
    }

    /// Sets explicit season and episode numbers
    pub fn with_numbers(mut self, season: u32, episode: u32) -> Self {
        self.season = Some(season);
        self.episode = Some(episode);
        self
    }
}

/// A resolved season/episode pair
///
/// Season 0 is the specials bucket and is a regular value here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeId {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeId {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

/// Searches free text for an `S<digits>E<digits>` token
///
/// Matching is case-insensitive and allows whitespace between the season and
/// episode parts. Digits of any width are accepted. Returns `None` when no
/// token is present or the numbers do not fit into a `u32`.
pub fn parse_episode_token(text: &str) -> Option<EpisodeId> {
    let captures = TITLE_TOKEN_RE.captures(text)?;
    let season = parse_number(&captures[1])?;
    let episode = parse_number(&captures[2])?;
    Some(EpisodeId { season, episode })
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DECIMAL_DIGIT_RE.is_match(c.encode_utf8(&mut buf))
}

/// Value of a decimal digit in any script
///
/// Unicode encodes decimal digits in contiguous runs starting at zero, so the
/// value is the distance to the start of the run, modulo ten.
fn digit_value(c: char) -> Option<u32> {
    if let Some(value) = c.to_digit(10) {
        return Some(value);
    }
    if !is_decimal_digit(c) {
        return None;
    }

    let mut offset = 0;
    let mut code = c as u32;
    while let Some(prev) = code.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        offset += 1;
        code -= 1;
    }
    Some(offset % 10)
}

/// Parses a run of decimal digits, accepting non-ASCII digits like `１２`
pub(crate) fn parse_number(digits: &str) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    digits
        .chars()
        .try_fold(0u32, |acc, c| acc.checked_mul(10)?.checked_add(digit_value(c)?))
}

/// Resolves the season/episode pair for a catalog record
///
/// When both explicit fields are set they are returned verbatim. Otherwise the
/// title is searched for an embedded token. `None` means the record cannot be
/// placed; callers report it and move on.
pub fn resolve_episode(record: &EpisodeRecord) -> Option<EpisodeId> {
    if let (Some(season), Some(episode)) = (record.season, record.episode) {
        return Some(EpisodeId { season, episode });
    }

    parse_episode_token(&record.title)
}
