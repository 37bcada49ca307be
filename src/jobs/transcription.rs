use super::{JobContext, JobError};
use crate::captions::{CaptionSegment, TranscriptResult};
use crate::stt::{ModelSize, SpeechEngine, SpeechRequest};
use crate::translate::languages::AUTO_DETECT;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TranscriptionParams {
    pub video_path: PathBuf,
    pub model_size: ModelSize,
    /// Language code, `None`/blank/`"auto"` for detection
    pub source_language: Option<String>,
}

pub struct TranscriptionJob {
    params: TranscriptionParams,
    engine: Arc<dyn SpeechEngine>,
}

impl TranscriptionJob {
    pub fn new(params: TranscriptionParams, engine: Arc<dyn SpeechEngine>) -> Result<Self, JobError> {
        if !params.video_path.is_file() {
            return Err(JobError::NoInput(format!(
                "Video not found: {}",
                params.video_path.display()
            )));
        }
        Ok(Self { params, engine })
    }

    fn language_hint(&self) -> Option<String> {
        self.params
            .source_language
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty() && !code.eq_ignore_ascii_case(AUTO_DETECT))
            .map(str::to_lowercase)
    }

    pub(super) async fn run(self, ctx: &JobContext) -> Result<TranscriptResult, JobError> {
        let size = self.params.model_size;

        ctx.progress(5, format!("Loading speech model '{}'...", size));
        let model = self
            .engine
            .load_model(size)
            .await
            .map_err(|e| JobError::ModelLoad(e.to_string()))?;
        ctx.progress(30, format!("Model '{}' loaded.", size));
        ctx.checkpoint()?;

        let language_hint = self.language_hint();
        let request = SpeechRequest {
            audio_source: self.params.video_path.clone(),
            language_hint: language_hint.clone(),
        };

        ctx.progress(35, format!("Transcribing with '{}' model...", size));
        tracing::info!(
            "Transcribing {} with {} ({}), language={}",
            request.audio_source.display(),
            self.engine.name(),
            size,
            language_hint.as_deref().unwrap_or(AUTO_DETECT)
        );
        let raw = model.transcribe(&request).await?;
        ctx.checkpoint()?;

        ctx.progress(90, "Finalizing transcription...");
        let segments: Vec<CaptionSegment> = raw
            .segments
            .into_iter()
            .enumerate()
            .map(|(i, s)| CaptionSegment::new(i as u32 + 1, s.start, s.end, s.text))
            .collect();

        let full_text = if raw.full_text.trim().is_empty() {
            segments
                .iter()
                .map(|s| s.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            raw.full_text
        };

        let language = raw.detected_language.or(language_hint).unwrap_or_default();
        let transcript = TranscriptResult::new(full_text, segments, language);

        tracing::info!(
            "Transcription done: {} segments, language={}, text_len={}",
            transcript.segments().len(),
            transcript.language_code(),
            transcript.full_text().len()
        );
        ctx.progress(100, "Transcription complete!");
        Ok(transcript)
    }
}
