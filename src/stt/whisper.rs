// src/stt/whisper.rs
// Whisper.cpp Local STT Engine

use super::{ModelSize, RawSegment, RawTranscript, SpeechEngine, SpeechModel, SpeechRequest, SttError};
use crate::media::ffmpeg;
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tokio::process::Command;

pub struct WhisperCppEngine {
    bin_path: Option<PathBuf>,
    models_dir: PathBuf,
    ffmpeg_bin: PathBuf,
    scratch_dir: PathBuf,
}

impl WhisperCppEngine {
    pub fn new(
        bin_path: Option<PathBuf>,
        models_dir: impl Into<PathBuf>,
        ffmpeg_bin: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        let bin_path = bin_path.or_else(default_whisper_bin);
        let models_dir = models_dir.into();

        match &bin_path {
            Some(p) => tracing::info!(
                "Whisper engine initialized: bin={}, models={}",
                p.display(),
                models_dir.display()
            ),
            None => tracing::warn!("Whisper bin not configured. Set WHISPER_CPP_BIN."),
        }

        Self {
            bin_path,
            models_dir,
            ffmpeg_bin: ffmpeg_bin.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Model file candidates for `size`, most preferred first
    pub fn model_candidates(&self, size: ModelSize) -> Vec<PathBuf> {
        let names: &[&str] = match size {
            ModelSize::Tiny => &["ggml-tiny.bin", "ggml-tiny.en.bin"],
            ModelSize::Base => &["ggml-base.bin", "ggml-base.en.bin"],
            ModelSize::Small => &["ggml-small.bin", "ggml-small.en.bin"],
            ModelSize::Medium => &["ggml-medium.bin", "ggml-medium.en.bin"],
            ModelSize::Large => &["ggml-large-v3.bin", "ggml-large-v2.bin", "ggml-large.bin"],
        };

        names.iter().map(|n| self.models_dir.join(n)).collect()
    }
}

#[async_trait]
impl SpeechEngine for WhisperCppEngine {
    async fn load_model(&self, size: ModelSize) -> Result<Box<dyn SpeechModel>, SttError> {
        let bin_path = match &self.bin_path {
            Some(p) if p.exists() => p.clone(),
            Some(p) => {
                return Err(SttError::ModelLoad(format!(
                    "Whisper bin not found at {}",
                    p.display()
                )))
            }
            None => {
                return Err(SttError::ModelLoad(
                    "Whisper bin not configured. Set WHISPER_CPP_BIN.".to_string(),
                ))
            }
        };

        let model_path = self
            .model_candidates(size)
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| {
                SttError::ModelNotFound(format!(
                    "no ggml model for '{}' in {}",
                    size,
                    self.models_dir.display()
                ))
            })?;

        // A truncated download shows up as a zero-length file
        let metadata = fs::metadata(&model_path)
            .map_err(|e| SttError::ModelLoad(format!("{}: {}", model_path.display(), e)))?;
        if metadata.len() == 0 {
            return Err(SttError::ModelLoad(format!(
                "model file {} is empty",
                model_path.display()
            )));
        }

        tracing::info!("Whisper model '{}' ready: {}", size, model_path.display());

        Ok(Box::new(WhisperCppModel {
            bin_path,
            model_path,
            ffmpeg_bin: self.ffmpeg_bin.clone(),
            scratch_dir: self.scratch_dir.clone(),
        }))
    }

    fn name(&self) -> &str {
        "Whisper.cpp"
    }
}

pub struct WhisperCppModel {
    bin_path: PathBuf,
    model_path: PathBuf,
    ffmpeg_bin: PathBuf,
    scratch_dir: PathBuf,
}

impl WhisperCppModel {
    async fn run_whisper(
        &self,
        wav_path: &Path,
        out_base: &Path,
        language: &str,
    ) -> Result<String, SttError> {
        let output = Command::new(&self.bin_path)
            .arg("--model")
            .arg(&self.model_path)
            .arg("--file")
            .arg(wav_path)
            .arg("--output-json")
            .arg("--output-file")
            .arg(out_base)
            .arg("--language")
            .arg(language)
            .output()
            .await
            .map_err(|e| SttError::EngineError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SttError::EngineError(format!(
                "Whisper failed: {}",
                stderr.trim()
            )));
        }

        let json_path = out_base.with_extension("json");
        fs::read_to_string(&json_path)
            .map_err(|e| SttError::InvalidOutput(format!("{}: {}", json_path.display(), e)))
    }
}

#[async_trait]
impl SpeechModel for WhisperCppModel {
    async fn transcribe(&self, request: &SpeechRequest) -> Result<RawTranscript, SttError> {
        let stamp = uuid::Uuid::new_v4().simple().to_string();
        let wav_path = self.scratch_dir.join(format!("whisper_input_{}.wav", stamp));
        let out_base = self.scratch_dir.join(format!("whisper_out_{}", stamp));

        let result = async {
            ffmpeg::extract_audio(&self.ffmpeg_bin, &request.audio_source, &wav_path)
                .await
                .map_err(|e| SttError::InvalidAudio(e.to_string()))?;

            let language = request.language_hint.as_deref().unwrap_or("auto");
            let raw_json = self.run_whisper(&wav_path, &out_base, language).await?;
            parse_whisper_json(&raw_json)
        }
        .await;

        // Cleanup temp files
        let _ = fs::remove_file(&wav_path);
        let _ = fs::remove_file(out_base.with_extension("json"));

        result
    }
}

#[derive(Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    result: Option<WhisperResultInfo>,
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
}

#[derive(Deserialize)]
struct WhisperResultInfo {
    language: Option<String>,
}

#[derive(Deserialize)]
struct WhisperSegment {
    offsets: WhisperOffsets,
    text: String,
}

#[derive(Deserialize)]
struct WhisperOffsets {
    from: u64,
    to: u64,
}

/// Map whisper.cpp `--output-json` into engine-neutral segments
pub(crate) fn parse_whisper_json(raw: &str) -> Result<RawTranscript, SttError> {
    let parsed: WhisperOutput =
        serde_json::from_str(raw).map_err(|e| SttError::InvalidOutput(e.to_string()))?;

    let full_text = parsed
        .transcription
        .iter()
        .map(|s| s.text.as_str())
        .collect::<String>()
        .trim()
        .to_string();

    let segments = parsed
        .transcription
        .into_iter()
        .map(|s| RawSegment {
            start: s.offsets.from as f64 / 1000.0,
            end: s.offsets.to as f64 / 1000.0,
            text: s.text,
        })
        .collect();

    let detected_language = parsed
        .result
        .and_then(|r| r.language)
        .filter(|l| !l.trim().is_empty());

    Ok(RawTranscript {
        full_text,
        segments,
        detected_language,
    })
}

fn default_whisper_bin() -> Option<PathBuf> {
    let candidates = [
        "bin/whisper-cli.exe",
        "bin/whisper-cli",
        "bin/main.exe",
        "bin/main",
    ];

    for c in candidates {
        let path = PathBuf::from(c);
        if path.exists() {
            return Some(path);
        }
    }

    // Fall back to whatever is on PATH
    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .map(|dir| dir.join("whisper-cli"))
            .find(|p| p.exists())
    })
}
