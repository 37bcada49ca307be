// summarize/types.rs: LLM adapter errors

/// LLM adapter errors
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Quota or rate limit exceeded: {0}")]
    RateLimitError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid response from LLM")]
    InvalidResponse,

    #[error("Timeout")]
    Timeout,

    #[error("Client configuration error: {0}")]
    ConfigError(String),
}
