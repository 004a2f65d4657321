use super::SubtitleError;
use super::convert::vtt_to_srt;
use crate::temp::ScratchFile;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How a subtitle file was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// ffmpeg transcoded the track straight to SRT
    Direct,
    /// The track was extracted as WebVTT and converted
    ConvertedFromWebVtt,
}

/// Checks if ffmpeg can be run
pub fn ffmpeg_available() -> bool {
    ffmpeg_sidecar::command::ffmpeg_is_installed()
}

/// Maps the first subtitle stream of `input` to `output` using `codec`
fn run_ffmpeg(input: &Path, codec: &str, output: &Path) -> Result<(), SubtitleError> {
    let failed = |message: String| SubtitleError::FfmpegFailed {
        path: input.to_path_buf(),
        message,
    };

    let mut child = FfmpegCommand::new()
        .hide_banner()
        .input(input)
        .args(["-map", "0:s:0", "-c:s", codec])
        .overwrite()
        .output(output)
        .spawn()
        .map_err(|e| failed(e.to_string()))?;

    let mut errors = Vec::new();
    for event in child.iter().map_err(|e| failed(e.to_string()))? {
        match event {
            FfmpegEvent::Error(message)
            | FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message) => errors.push(message),
            _ => {}
        }
    }

    let status = child.wait().map_err(|e| failed(e.to_string()))?;
    if !status.success() {
        let message = if errors.is_empty() {
            format!("ffmpeg exited with {}", status)
        } else {
            errors.join("; ")
        };
        return Err(failed(message));
    }

    Ok(())
}

/// Extracts the first subtitle track of a video into `<output_dir>/<stem>.srt`
///
/// Direct SRT transcoding is tried first. If ffmpeg refuses, the track is
/// extracted as WebVTT into a scratch file next to the output and converted.
/// Returns the written path and the method that worked.
pub fn extract_subtitles(
    video: &Path,
    output_dir: &Path,
) -> Result<(PathBuf, ExtractionMethod), SubtitleError> {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subtitles".to_string());
    let srt_path = output_dir.join(format!("{}.srt", stem));

    match run_ffmpeg(video, "srt", &srt_path) {
        Ok(()) => return Ok((srt_path, ExtractionMethod::Direct)),
        Err(e) => {
            debug!(video = %video.display(), error = %e, "direct SRT extraction failed, trying WebVTT");
            let _ = fs::remove_file(&srt_path);
        }
    }

    let scratch = ScratchFile::reserve(output_dir, &stem, "vtt");
    run_ffmpeg(video, "webvtt", &scratch)?;

    let vtt = fs::read_to_string(&*scratch).map_err(|e| SubtitleError::ReadFailed {
        path: scratch.to_path_buf(),
        source: e,
    })?;

    fs::write(&srt_path, vtt_to_srt(&vtt)).map_err(|e| SubtitleError::WriteFailed {
        path: srt_path.clone(),
        source: e,
    })?;

    Ok((srt_path, ExtractionMethod::ConvertedFromWebVtt))
}
