// src/translate/google.rs
// Google Translate web endpoint adapter

use super::languages::{self, AUTO_DETECT};
use super::{TranslationEngine, TranslationError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";
const TIMEOUT_SECS: u64 = 15;

pub struct GoogleTranslateAdapter {
    client: Client,
}

impl GoogleTranslateAdapter {
    pub fn new() -> Result<Self, TranslationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| TranslationError::ProviderError(e.to_string()))?;

        tracing::info!("Google Translate adapter initialized");

        Ok(Self { client })
    }
}

#[async_trait]
impl TranslationEngine for GoogleTranslateAdapter {
    async fn prepare(&self, source: &str, target: &str) -> Result<(), TranslationError> {
        if source != AUTO_DETECT && !languages::is_known_target(source) {
            return Err(TranslationError::UnsupportedLanguage(source.to_string()));
        }
        if target == AUTO_DETECT || !languages::is_known_target(target) {
            return Err(TranslationError::UnsupportedLanguage(target.to_string()));
        }
        Ok(())
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        let response = self
            .client
            .get(TRANSLATE_URL)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslationError::Timeout
                } else {
                    TranslationError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::ProviderError(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|_| TranslationError::InvalidResponse)?;

        parse_translation(&body)
    }

    fn name(&self) -> &str {
        "google-translate"
    }
}

/// The endpoint answers `[[["translated", "original", ...], ...], ...]`
fn parse_translation(body: &Value) -> Result<String, TranslationError> {
    let chunks = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or(TranslationError::InvalidResponse)?;

    let translated: String = chunks
        .iter()
        .filter_map(|chunk| chunk.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(TranslationError::InvalidResponse);
    }

    Ok(translated)
}
