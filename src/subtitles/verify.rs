use super::SubtitleError;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Structural check result for one SRT file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SrtReport {
    pub entries: usize,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
    pub issues: Vec<String>,
}

impl SrtReport {
    /// At least one entry and nothing flagged
    pub fn is_valid(&self) -> bool {
        self.entries > 0 && self.issues.is_empty()
    }
}

/// Checks SRT content entry by entry
///
/// An entry starts with a numeric line at the beginning of a block. It must be
/// followed by a timing line and at least one line of text.
pub fn verify_srt(content: &str) -> SrtReport {
    let normalized = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let lines: Vec<&str> = normalized.lines().map(str::trim).collect();
    let mut report = SrtReport::default();

    for (i, line) in lines.iter().enumerate() {
        let block_start = i == 0 || lines[i - 1].is_empty();
        if !block_start || line.is_empty() || !line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        report.entries += 1;
        let entry = report.entries;

        match lines.get(i + 1).and_then(|timing| timing.split_once("-->")) {
            Some((start, end)) => {
                if report.first_timestamp.is_none() {
                    report.first_timestamp = Some(start.trim().to_string());
                }
                report.last_timestamp = Some(end.trim().to_string());
            }
            None => report.issues.push(format!("Entry {}: missing timestamp", entry)),
        }

        if lines.get(i + 2).is_none_or(|text| text.is_empty()) {
            report.issues.push(format!("Entry {}: missing text", entry));
        }
    }

    report
}

pub fn verify_srt_file(path: &Path) -> Result<SrtReport, SubtitleError> {
    let content = fs::read_to_string(path).map_err(|e| SubtitleError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(verify_srt(&content))
}
