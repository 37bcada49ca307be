use super::srt::{self, SrtError};
use super::{CaptionSegment, CaptionSource};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Nothing to export: {0}")]
    NothingToExport(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Write a summary as plain UTF-8 text.
pub fn export_summary(path: &Path, summary: &str) -> Result<(), ExportError> {
    if summary.trim().is_empty() {
        return Err(ExportError::NothingToExport(
            "No summary text to export".to_string(),
        ));
    }

    fs::write(path, summary).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;

    tracing::info!("Summary exported to {}", path.display());
    Ok(())
}

/// Write a subtitle track as SubRip.
pub fn export_subtitles(path: &Path, segments: &[CaptionSegment]) -> Result<(), ExportError> {
    if segments.is_empty() {
        return Err(ExportError::NothingToExport(
            "No subtitle segments to export".to_string(),
        ));
    }

    srt::write_file(path, segments).map_err(|e| match e {
        SrtError::Io(source) => ExportError::Io {
            path: path.display().to_string(),
            source,
        },
        other => ExportError::NothingToExport(other.to_string()),
    })?;

    tracing::info!(
        "Exported {} subtitle segments to {}",
        segments.len(),
        path.display()
    );
    Ok(())
}

pub fn default_summary_filename(video: Option<&Path>) -> String {
    match video_stem(video) {
        Some(stem) => format!("{}_summary.txt", stem),
        None => "summary.txt".to_string(),
    }
}

pub fn default_subtitle_filename(video: Option<&Path>, language_code: &str) -> String {
    match video_stem(video) {
        Some(stem) => format!("{}_subs_{}.srt", stem, language_code),
        None => format!("subtitles_{}.srt", language_code),
    }
}

pub fn default_video_filename(video: &Path, source: CaptionSource) -> String {
    let stem = video_stem(Some(video)).unwrap_or_else(|| "video".to_string());
    format!("{}_with_{}_subs.mp4", stem, source)
}

fn video_stem(video: Option<&Path>) -> Option<String> {
    video
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
