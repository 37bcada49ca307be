// src/media/mod.rs
// Media boundaries: muxing, audio extraction and the external playback component

pub mod ffmpeg;
pub mod sidecar;

pub use ffmpeg::FfmpegMuxer;
pub use sidecar::{SidecarError, SidecarManager};

use crate::captions::CaptionSegment;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not available: {0}")]
    ToolMissing(String),

    #[error("Input not found: {0}")]
    InputMissing(String),

    #[error("ffmpeg failed: {0}")]
    ProcessFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Combines a video with a subtitle track into a new container
#[async_trait]
pub trait Muxer: Send + Sync {
    async fn mux(&self, video: &Path, subtitles: &Path, output: &Path) -> Result<(), MediaError>;

    fn name(&self) -> &str;
}

/// The video playback component owned by the UI.
///
/// The core never renders anything itself: it only tells the player which
/// video to open, which sidecar subtitle file to attach and which captions to
/// overlay.
pub trait PlaybackSink: Send {
    /// Stop any active playback.
    fn stop(&mut self);

    /// Open `video` in a fresh playback session, optionally with a sidecar subtitle file.
    fn open(&mut self, video: &Path, subtitles: Option<&Path>) -> Result<(), String>;

    /// Replace the caption overlay.
    fn show_captions(&mut self, segments: &[CaptionSegment]);
}
