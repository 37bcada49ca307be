// summarize/gemini.rs: Google Gemini LLM adapter

use super::{LLMAdapter, LLMError, LLMProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MODEL: &str = "gemini-2.0-flash";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Builds [`GeminiAdapter`]s with a shared request timeout
pub struct GeminiProvider {
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl LLMProvider for GeminiProvider {
    fn connect(&self, api_key: &str) -> Result<Box<dyn LLMAdapter>, LLMError> {
        Ok(Box::new(GeminiAdapter::new(api_key.to_string(), self.timeout)?))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

pub struct GeminiAdapter {
    client: Client,
    api_key: String,
}

impl GeminiAdapter {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, LLMError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LLMError::ConfigError(e.to_string()))?;

        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl LLMAdapter for GeminiAdapter {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        let url = format!("{}/{}:generateContent", API_BASE, MODEL);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                max_output_tokens: 2048,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(format!("Gemini: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let gemini: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ProviderError(format!("Gemini parse: {}", e)))?;

        extract_text(gemini)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn classify_status(status: StatusCode, body: String) -> LLMError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LLMError::AuthenticationError(format!("Gemini {}: {}", status, body))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            LLMError::RateLimitError(format!("Gemini {}: {}", status, body))
        }
        // Gemini answers 400 for an invalid key
        StatusCode::BAD_REQUEST if body.contains("API_KEY_INVALID") => {
            LLMError::AuthenticationError(format!("Gemini {}: {}", status, body))
        }
        _ => LLMError::ProviderError(format!("Gemini {}: {}", status, body)),
    }
}

fn extract_text(response: GeminiResponse) -> Result<String, LLMError> {
    let text: String = response
        .candidates
        .first()
        .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    if text.is_empty() {
        Err(LLMError::InvalidResponse)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_concatenates_parts() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Key "},{"text":"points."}]}}]}"#,
        )
        .unwrap();

        assert_eq!(extract_text(response).unwrap(), "Key points.");
    }

    #[test]
    fn test_extract_text_without_candidates() {
        let response: GeminiResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert!(matches!(extract_text(response), Err(LLMError::InvalidResponse)));
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, String::new()),
            LLMError::AuthenticationError(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            LLMError::RateLimitError(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "API_KEY_INVALID".to_string()),
            LLMError::AuthenticationError(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            LLMError::ProviderError(_)
        ));
    }
}
