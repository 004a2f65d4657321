//! Placeholder templates for file and directory names
//!
//! A template is parsed once into literal and placeholder segments. Each
//! template kind accepts a fixed set of placeholders; anything else is rejected
//! at parse time so that a typo in a series config fails loudly instead of
//! leaking `{sesaon}` into a filename.
//!
//! Syntax:
//! - `{name}` inserts a value
//! - `{name:02d}` or `{name:02}` inserts a number zero-padded to the width
//! - `{name:3d}` pads a number with spaces
//! - `{{` and `}}` are literal braces

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Widest zero-padding a numeric placeholder may request
const MAX_WIDTH: usize = 10;

/// Errors produced while parsing a template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Unknown placeholder '{{{name}}}' in pattern \"{pattern}\" (allowed: {allowed})")]
    UnknownPlaceholder {
        name: String,
        pattern: String,
        allowed: String,
    },

    #[error("Invalid format directive '{directive}' for '{{{name}}}' in pattern \"{pattern}\"")]
    InvalidDirective {
        name: String,
        directive: String,
        pattern: String,
    },

    #[error("Unbalanced brace at position {position} in pattern \"{pattern}\"")]
    UnbalancedBrace { position: usize, pattern: String },
}

/// Values that can be substituted into a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Season,
    Episode,
    Title,
    SeriesName,
    SeasonName,
}

impl Placeholder {
    fn name(self) -> &'static str {
        match self {
            Placeholder::Season => "season",
            Placeholder::Episode => "episode",
            Placeholder::Title => "title",
            Placeholder::SeriesName => "series_name",
            Placeholder::SeasonName => "season_name",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Placeholder::Season | Placeholder::Episode)
    }
}

/// Which placeholder set a template is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Episode file names: `{season}`, `{episode}`, `{title}`
    Filename,
    /// Season directories: `{series_name}`, `{season}`, `{season_name}`
    Directory,
}

impl TemplateKind {
    fn allowed(self) -> &'static [Placeholder] {
        match self {
            TemplateKind::Filename => &[
                Placeholder::Season,
                Placeholder::Episode,
                Placeholder::Title,
            ],
            TemplateKind::Directory => &[
                Placeholder::SeriesName,
                Placeholder::Season,
                Placeholder::SeasonName,
            ],
        }
    }

    fn lookup(self, name: &str) -> Option<Placeholder> {
        self.allowed().iter().copied().find(|p| p.name() == name)
    }

    fn allowed_list(self) -> String {
        self.allowed()
            .iter()
            .map(|p| format!("{{{}}}", p.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        placeholder: Placeholder,
        width: Option<usize>,
        zero_pad: bool,
    },
}

/// Substitution values for rendering
///
/// Fields a template does not reference may stay `None`; a referenced field
/// that is `None` renders as an empty string.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateValues<'a> {
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub title: Option<&'a str>,
    pub series_name: Option<&'a str>,
    pub season_name: Option<&'a str>,
}

/// A parsed and validated template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pattern: String,
    kind: TemplateKind,
    segments: Vec<Segment>,
}

impl Template {
    /// Parses and validates a pattern for the given kind
    pub fn parse(pattern: &str, kind: TemplateKind) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(TemplateError::UnbalancedBrace {
                        position,
                        pattern: pattern.to_string(),
                    });
                }
                '{' => {
                    let mut inner = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed || inner.contains('{') {
                        return Err(TemplateError::UnbalancedBrace {
                            position,
                            pattern: pattern.to_string(),
                        });
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_field(&inner, pattern, kind)?);
                }
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            kind,
            segments,
        })
    }

    /// The pattern as written in the configuration
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Extension fixed by the trailing literal text, if the pattern ends in one
    ///
    /// `S{season:02d}E{episode:02d}_{title}.mp4` yields `mp4`. A pattern that
    /// ends in a placeholder has no fixed extension.
    pub fn literal_extension(&self) -> Option<&str> {
        match self.segments.last()? {
            Segment::Literal(text) => text.rsplit_once('.').map(|(_, ext)| ext),
            Segment::Field { .. } => None,
        }
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Returns true if the template references the given placeholder
    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.segments.iter().any(|segment| {
            matches!(segment, Segment::Field { placeholder: p, .. } if *p == placeholder)
        })
    }

    /// Substitutes the given values
    pub fn render(&self, values: &TemplateValues<'_>) -> String {
        let mut output = String::with_capacity(self.pattern.len() + 32);

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Field {
                    placeholder,
                    width,
                    zero_pad,
                } => {
                    let number = match placeholder {
                        Placeholder::Season => values.season,
                        Placeholder::Episode => values.episode,
                        _ => None,
                    };
                    match (number, width) {
                        (Some(n), Some(w)) if *zero_pad => {
                            output.push_str(&format!("{:0width$}", n, width = *w))
                        }
                        (Some(n), Some(w)) => output.push_str(&format!("{:>width$}", n, width = *w)),
                        (Some(n), None) => output.push_str(&n.to_string()),
                        (None, _) => {
                            let text = match placeholder {
                                Placeholder::Title => values.title,
                                Placeholder::SeriesName => values.series_name,
                                Placeholder::SeasonName => values.season_name,
                                _ => None,
                            };
                            output.push_str(text.unwrap_or_default());
                        }
                    }
                }
            }
        }

        output
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn parse_field(inner: &str, pattern: &str, kind: TemplateKind) -> Result<Segment, TemplateError> {
    let (name, directive) = match inner.split_once(':') {
        Some((name, directive)) => (name, Some(directive)),
        None => (inner, None),
    };

    let placeholder = kind
        .lookup(name)
        .ok_or_else(|| TemplateError::UnknownPlaceholder {
            name: name.to_string(),
            pattern: pattern.to_string(),
            allowed: kind.allowed_list(),
        })?;

    let Some(directive) = directive else {
        return Ok(Segment::Field {
            placeholder,
            width: None,
            zero_pad: false,
        });
    };

    let invalid = || TemplateError::InvalidDirective {
        name: name.to_string(),
        directive: directive.to_string(),
        pattern: pattern.to_string(),
    };

    if !placeholder.is_numeric() {
        return Err(invalid());
    }

    let digits = directive.strip_suffix('d').unwrap_or(directive);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let width: usize = digits.parse().map_err(|_| invalid())?;
    if width > MAX_WIDTH {
        return Err(invalid());
    }

    Ok(Segment::Field {
        placeholder,
        width: Some(width),
        zero_pad: digits.starts_with('0'),
    })
}

/// Episode file name pattern
///
/// Deserializes from a string and is validated against the filename
/// placeholder set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamingPattern(Template);

impl NamingPattern {
    pub const DEFAULT: &'static str = "S{season:02d}E{episode:02d}_{title}.mp4";

    pub fn parse(pattern: &str) -> Result<Self, TemplateError> {
        Template::parse(pattern, TemplateKind::Filename).map(Self)
    }

    pub fn template(&self) -> &Template {
        &self.0
    }
}

impl Default for NamingPattern {
    fn default() -> Self {
        Self::parse(Self::DEFAULT).unwrap()
    }
}

impl TryFrom<String> for NamingPattern {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NamingPattern> for String {
    fn from(value: NamingPattern) -> Self {
        value.0.pattern
    }
}

/// Season directory pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DirectoryPattern(Template);

impl DirectoryPattern {
    pub const DEFAULT: &'static str = "Season_{season}_HD";

    pub fn parse(pattern: &str) -> Result<Self, TemplateError> {
        Template::parse(pattern, TemplateKind::Directory).map(Self)
    }

    pub fn template(&self) -> &Template {
        &self.0
    }
}

impl Default for DirectoryPattern {
    fn default() -> Self {
        Self::parse(Self::DEFAULT).unwrap()
    }
}

impl TryFrom<String> for DirectoryPattern {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DirectoryPattern> for String {
    fn from(value: DirectoryPattern) -> Self {
        value.0.pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode_values(season: u32, episode: u32, title: &str) -> TemplateValues<'_> {
        TemplateValues {
            season: Some(season),
            episode: Some(episode),
            title: Some(title),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_naming_pattern() {
        let pattern = NamingPattern::default();
        assert_eq!(
            pattern.template().render(&episode_values(1, 2, "Two")),
            "S01E02_Two.mp4"
        );
    }

    #[test]
    fn test_padding_directives() {
        let template =
            Template::parse("{season:03}-{episode:2d}-{episode}", TemplateKind::Filename).unwrap();
        assert_eq!(template.render(&episode_values(4, 7, "")), "004- 7-7");
    }

    #[test]
    fn test_width_narrower_than_value() {
        let template = Template::parse("S{season:02d}", TemplateKind::Filename).unwrap();
        assert_eq!(template.render(&episode_values(123, 1, "")), "S123");
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let err = Template::parse("{sesaon}_{title}", TemplateKind::Filename).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownPlaceholder { ref name, .. } if name == "sesaon"));
    }

    #[test]
    fn test_placeholder_sets_are_per_kind() {
        assert!(Template::parse("{series_name}", TemplateKind::Filename).is_err());
        assert!(Template::parse("{title}", TemplateKind::Directory).is_err());
        assert!(Template::parse("{series_name}/{season_name}", TemplateKind::Directory).is_ok());
    }

    #[test]
    fn test_directive_on_text_placeholder_rejected() {
        let err = Template::parse("{title:02d}", TemplateKind::Filename).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidDirective { .. }));
    }

    #[test]
    fn test_malformed_directive_rejected() {
        assert!(Template::parse("{season:x}", TemplateKind::Filename).is_err());
        assert!(Template::parse("{season:}", TemplateKind::Filename).is_err());
        assert!(Template::parse("{season:d}", TemplateKind::Filename).is_err());
    }

    #[test]
    fn test_literal_extension() {
        let ext = |pattern: &str| {
            Template::parse(pattern, TemplateKind::Filename)
                .unwrap()
                .literal_extension()
                .map(str::to_string)
        };
        assert_eq!(ext(NamingPattern::DEFAULT).as_deref(), Some("mp4"));
        assert_eq!(ext("{season}x{episode:02d}_{title}.mkv").as_deref(), Some("mkv"));
        assert_eq!(ext("{season}x{episode}.{title}"), None);
        assert_eq!(ext("{title}_final"), None);
    }

    #[test]
    fn test_oversized_width_rejected() {
        assert!(Template::parse("{season:010d}", TemplateKind::Filename).is_ok());
        for pattern in ["{season:011d}", "{episode:999999999999}", "{season:99999999999999999999999}"] {
            let err = Template::parse(pattern, TemplateKind::Filename).unwrap_err();
            assert!(matches!(err, TemplateError::InvalidDirective { .. }));
        }
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert!(matches!(
            Template::parse("S{season", TemplateKind::Filename),
            Err(TemplateError::UnbalancedBrace { .. })
        ));
        assert!(matches!(
            Template::parse("S}season", TemplateKind::Filename),
            Err(TemplateError::UnbalancedBrace { position: 1, .. })
        ));
        assert!(Template::parse("{{season}", TemplateKind::Filename).is_err());
    }

    #[test]
    fn test_escaped_braces() {
        let template = Template::parse("{{{season}}}", TemplateKind::Filename).unwrap();
        assert_eq!(template.render(&episode_values(3, 1, "")), "{3}");
    }

    #[test]
    fn test_missing_value_renders_empty() {
        let template = Template::parse("S{season}_{title}", TemplateKind::Filename).unwrap();
        let values = TemplateValues {
            season: Some(2),
            ..Default::default()
        };
        assert_eq!(template.render(&values), "S2_");
    }

    #[test]
    fn test_uses() {
        let pattern = DirectoryPattern::default();
        assert!(pattern.template().uses(Placeholder::Season));
        assert!(!pattern.template().uses(Placeholder::SeriesName));
    }

    #[test]
    fn test_pattern_deserialization_validates() {
        let ok: Result<NamingPattern, _> = serde_json::from_str(r#""{season}_{episode}_{title}.mp4""#);
        assert!(ok.is_ok());

        let bad: Result<NamingPattern, _> = serde_json::from_str(r#""{show}_{title}.mp4""#);
        let message = bad.unwrap_err().to_string();
        assert!(message.contains("Unknown placeholder"));
    }

    #[test]
    fn test_pattern_serializes_as_written() {
        let pattern = DirectoryPattern::parse("Series_{series_name}").unwrap();
        assert_eq!(serde_json::to_string(&pattern).unwrap(), r#""Series_{series_name}""#);
    }
}
