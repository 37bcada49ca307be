// src/stt/mod.rs
// STT Module - Speech-to-Text engine boundary

mod types;
mod whisper;

pub use types::{ModelSize, RawSegment, RawTranscript, SpeechRequest, SttError};
pub use whisper::{WhisperCppEngine, WhisperCppModel};

use async_trait::async_trait;

/// A speech-to-text engine able to prepare models of different sizes
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Load or prepare the model for `size`
    async fn load_model(&self, size: ModelSize) -> Result<Box<dyn SpeechModel>, SttError>;

    /// Get provider name
    fn name(&self) -> &str;
}

/// A loaded model. Transcription is an opaque call that cannot be interrupted.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    async fn transcribe(&self, request: &SpeechRequest) -> Result<RawTranscript, SttError>;
}
