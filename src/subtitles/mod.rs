//! Subtitle post-processing
//!
//! Extracts the embedded subtitle track of downloaded episodes into SRT files
//! and checks SRT files for structural problems.

mod convert;
mod extract;
mod verify;

pub use convert::vtt_to_srt;
pub use extract::{ExtractionMethod, extract_subtitles, ffmpeg_available};
pub use verify::{SrtReport, verify_srt, verify_srt_file};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during subtitle processing
#[derive(Debug, Error)]
pub enum SubtitleError {
    #[error("ffmpeg is not installed or not in PATH")]
    FfmpegNotInstalled,

    #[error("ffmpeg failed for {path}: {message}")]
    FfmpegFailed { path: PathBuf, message: String },

    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}
