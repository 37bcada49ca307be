use super::PlaybackSink;
use crate::captions::{srt, CaptionSegment};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("No subtitle segments to attach")]
    NoSegments,

    #[error("Failed to write sidecar file: {0}")]
    Write(String),

    #[error("Playback rejected the sidecar: {0}")]
    Playback(String),
}

/// Tracks the single sidecar subtitle file of a session
pub struct SidecarManager {
    dir: PathBuf,
    current: Option<PathBuf>,
}

impl SidecarManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: None,
        }
    }

    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Write `segments` to a fresh sidecar and reopen `video` on `playback` with it.
    ///
    /// The previously tracked sidecar is deleted first. On failure the new file is
    /// removed again and nothing stays tracked.
    pub fn attach(
        &mut self,
        video: &Path,
        segments: &[CaptionSegment],
        playback: &mut dyn PlaybackSink,
    ) -> Result<PathBuf, SidecarError> {
        if segments.is_empty() {
            return Err(SidecarError::NoSegments);
        }

        self.clear();

        let path = self
            .dir
            .join(format!("caption_lab_{}.srt", uuid::Uuid::new_v4().simple()));

        if let Err(e) = srt::write_file(&path, segments) {
            remove_quietly(&path);
            return Err(SidecarError::Write(e.to_string()));
        }
        self.current = Some(path.clone());

        playback.stop();
        if let Err(e) = playback.open(video, Some(&path)) {
            tracing::warn!("Playback could not load sidecar {}: {}", path.display(), e);
            self.clear();
            return Err(SidecarError::Playback(e));
        }

        tracing::info!(
            "Attached {} subtitle segments via {}",
            segments.len(),
            path.display()
        );
        Ok(path)
    }

    /// Delete the tracked sidecar, if any. Deletion failures are logged only.
    pub fn clear(&mut self) {
        if let Some(path) = self.current.take() {
            remove_quietly(&path);
        }
    }
}

impl Drop for SidecarManager {
    fn drop(&mut self) {
        self.clear();
    }
}

fn remove_quietly(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!("Could not remove sidecar file {}: {}", path.display(), e);
    }
}
