// summarize/mod.rs: LLM traits + summary prompt

pub mod gemini;
mod types;

pub use gemini::{GeminiAdapter, GeminiProvider};
pub use types::LLMError;

use async_trait::async_trait;

/// Trait for LLM text generation adapters
#[async_trait]
pub trait LLMAdapter: Send + Sync {
    /// Generate text from prompt
    async fn generate(&self, prompt: &str) -> Result<String, LLMError>;

    /// Provider name
    fn name(&self) -> &str;
}

/// Builds authenticated adapters. Credentials are supplied per job, not at startup.
pub trait LLMProvider: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Box<dyn LLMAdapter>, LLMError>;

    fn name(&self) -> &str;
}

/// Wrap `text` in the fixed summarization prompt.
pub fn build_summary_prompt(text: &str) -> String {
    format!("Summarize the following text:\n\n{}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_wraps_text_verbatim() {
        let prompt = build_summary_prompt("  line one\nline two ");
        assert!(prompt.starts_with("Summarize the following text:\n\n"));
        assert!(prompt.ends_with("  line one\nline two "));
    }
}
