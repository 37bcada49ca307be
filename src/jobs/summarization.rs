use super::{with_timeout, JobContext, JobError};
use crate::summarize::{build_summary_prompt, LLMError, LLMProvider};
use std::sync::Arc;
use std::time::Duration;

pub struct SummarizationJob {
    text: String,
    api_key: Option<String>,
    provider: Arc<dyn LLMProvider>,
    call_timeout: Duration,
}

impl SummarizationJob {
    pub fn new(
        text: impl Into<String>,
        api_key: Option<String>,
        provider: Arc<dyn LLMProvider>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            text: text.into(),
            api_key,
            provider,
            call_timeout,
        }
    }

    pub(super) async fn run(self, ctx: &JobContext) -> Result<String, JobError> {
        if self.text.trim().is_empty() {
            return Err(JobError::NoInput("No text to summarize".to_string()));
        }

        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                JobError::Configuration(
                    "Gemini API key not found. Set GEMINI_API_KEY in the environment or config."
                        .to_string(),
                )
            })?;

        ctx.checkpoint()?;
        ctx.progress(10, "Initializing summarization model...");
        let adapter = self
            .provider
            .connect(api_key)
            .map_err(|e| JobError::Configuration(e.to_string()))?;
        ctx.progress(30, "Model initialized.");
        ctx.checkpoint()?;

        ctx.progress(40, "Generating summary...");
        tracing::info!(
            "Summarizing {} chars via {}",
            self.text.len(),
            adapter.name()
        );
        let prompt = build_summary_prompt(&self.text);
        let summary = match with_timeout(self.call_timeout, adapter.generate(&prompt)).await? {
            Ok(summary) => summary,
            Err(LLMError::Timeout) => return Err(JobError::Timeout(self.call_timeout.as_secs())),
            Err(e) => return Err(JobError::Service(e.to_string())),
        };

        ctx.progress(100, "Summary complete!");
        Ok(summary)
    }
}
