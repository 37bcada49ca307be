use crate::config::AppConfig;
use crate::media::{FfmpegMuxer, Muxer};
use crate::stt::{SpeechEngine, WhisperCppEngine};
use crate::summarize::{GeminiProvider, LLMProvider};
use crate::translate::{GoogleTranslateAdapter, TranslationEngine};
use std::sync::Arc;

/// External engines shared by every job
#[derive(Clone)]
pub struct Engines {
    pub speech: Arc<dyn SpeechEngine>,
    pub translator: Arc<dyn TranslationEngine>,
    pub summarizer: Arc<dyn LLMProvider>,
    pub muxer: Arc<dyn Muxer>,
}

impl Engines {
    pub fn from_config(config: &AppConfig) -> Result<Self, String> {
        let speech = WhisperCppEngine::new(
            config.whisper_bin.clone(),
            config.models_dir.clone(),
            config.ffmpeg_bin.clone(),
            config.scratch_dir(),
        );

        let translator = GoogleTranslateAdapter::new()
            .map_err(|e| format!("Failed to initialize translator: {}", e))?;

        let summarizer = GeminiProvider::new(config.summarization_timeout());
        let muxer = FfmpegMuxer::new(config.ffmpeg_bin.clone());

        match config.masked_api_key() {
            Some(masked) => tracing::info!("Summarization key configured: {}", masked),
            None => tracing::warn!("GEMINI_API_KEY not set; summarization will be unavailable"),
        }

        tracing::info!(
            "Engines ready: speech={}, translator={}, summarizer={}, muxer={}",
            speech.name(),
            translator.name(),
            summarizer.name(),
            muxer.name()
        );

        Ok(Self {
            speech: Arc::new(speech),
            translator: Arc::new(translator),
            summarizer: Arc::new(summarizer),
            muxer: Arc::new(muxer),
        })
    }
}
