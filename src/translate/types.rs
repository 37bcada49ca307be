use thiserror::Error;

/// Translation adapter errors
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid response from translator")]
    InvalidResponse,

    #[error("Timeout")]
    Timeout,
}
