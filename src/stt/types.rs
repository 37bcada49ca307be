// src/stt/types.rs
// STT Types and Error Definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Speech model size. Larger models are slower and more accurate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub const ALL: [ModelSize; 5] = [
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ModelSize::ALL
            .into_iter()
            .find(|size| size.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = ModelSize::ALL.iter().map(ModelSize::as_str).collect();
                format!(
                    "Unknown model size '{}' (expected one of: {})",
                    wanted,
                    names.join(", ")
                )
            })
    }
}

/// Input handed to a loaded speech model
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    /// Media file whose audio track is transcribed
    pub audio_source: PathBuf,
    /// Language hint, `None` for automatic detection
    pub language_hint: Option<String>,
}

/// One segment as reported by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Engine-native transcription output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTranscript {
    pub full_text: String,
    pub segments: Vec<RawSegment>,
    pub detected_language: Option<String>,
}

/// STT Error types
#[derive(Debug, Error)]
pub enum SttError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Model failed to load: {0}")]
    ModelLoad(String),

    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Engine error: {0}")]
    EngineError(String),

    #[error("Unreadable engine output: {0}")]
    InvalidOutput(String),
}

impl SttError {
    /// True for errors raised while preparing the model rather than decoding
    pub fn is_model_error(&self) -> bool {
        matches!(self, SttError::ModelNotFound(_) | SttError::ModelLoad(_))
    }
}
