// src/translate/mod.rs
// Translation engine boundary

mod google;
pub mod languages;
mod types;

pub use google::GoogleTranslateAdapter;
pub use types::TranslationError;

use async_trait::async_trait;

/// Per-call text translation
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    /// Check the engine can translate `source -> target` before any text is sent
    async fn prepare(&self, source: &str, target: &str) -> Result<(), TranslationError>;

    /// Translate one unit of text
    async fn translate(&self, text: &str, source: &str, target: &str)
        -> Result<String, TranslationError>;

    /// Provider name
    fn name(&self) -> &str;
}
