// src/media/ffmpeg.rs
// ffmpeg-backed audio extraction and subtitle muxing

use super::{MediaError, Muxer};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::process::Command;

const TARGET_SAMPLE_RATE: u32 = 16000;

/// Extract the audio track of `video` as 16 kHz mono PCM WAV.
pub async fn extract_audio(ffmpeg_bin: &Path, video: &Path, wav_out: &Path) -> Result<(), MediaError> {
    if !video.exists() {
        return Err(MediaError::InputMissing(video.display().to_string()));
    }

    tracing::debug!(
        "Extracting audio: {} -> {}",
        video.display(),
        wav_out.display()
    );

    let output = Command::new(ffmpeg_bin)
        .arg("-y")
        .arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(video)
        .arg("-vn")
        .arg("-ac")
        .arg("1")
        .arg("-ar")
        .arg(TARGET_SAMPLE_RATE.to_string())
        .arg("-c:a")
        .arg("pcm_s16le")
        .arg(wav_out)
        .output()
        .await
        .map_err(|e| spawn_error(ffmpeg_bin, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::ProcessFailed(stderr.trim().to_string()));
    }

    Ok(())
}

/// Subtitle codec accepted by the container implied by `output`'s extension
pub fn subtitle_codec_for(output: &Path) -> &'static str {
    match output
        .extension()
        .and_then(OsStr::to_str)
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mkv") => "srt",
        Some("webm") => "webvtt",
        _ => "mov_text",
    }
}

pub struct FfmpegMuxer {
    bin_path: PathBuf,
}

impl FfmpegMuxer {
    pub fn new(bin_path: impl Into<PathBuf>) -> Self {
        Self {
            bin_path: bin_path.into(),
        }
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(&self, video: &Path, subtitles: &Path, output: &Path) -> Result<(), MediaError> {
        if !video.exists() {
            return Err(MediaError::InputMissing(video.display().to_string()));
        }
        if !subtitles.exists() {
            return Err(MediaError::InputMissing(subtitles.display().to_string()));
        }

        let codec = subtitle_codec_for(output);
        tracing::info!(
            "Muxing {} + {} -> {} (subtitle codec {})",
            video.display(),
            subtitles.display(),
            output.display(),
            codec
        );

        let result = Command::new(&self.bin_path)
            .arg("-y")
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(subtitles)
            .arg("-map")
            .arg("0")
            .arg("-map")
            .arg("1")
            .arg("-c")
            .arg("copy")
            .arg("-c:s")
            .arg(codec)
            .arg(output)
            .output()
            .await
            .map_err(|e| spawn_error(&self.bin_path, e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            // Leave no half-written container behind
            let _ = std::fs::remove_file(output);
            return Err(MediaError::ProcessFailed(stderr.trim().to_string()));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

fn spawn_error(bin: &Path, err: std::io::Error) -> MediaError {
    if err.kind() == std::io::ErrorKind::NotFound {
        MediaError::ToolMissing(bin.display().to_string())
    } else {
        MediaError::Io(err)
    }
}
