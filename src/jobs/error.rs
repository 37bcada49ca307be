use crate::captions::srt::SrtError;
use crate::media::MediaError;
use crate::stt::SttError;
use crate::summarize::LLMError;
use serde::Serialize;
use thiserror::Error;

/// Error categories reported to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ModelLoadError,
    TranscriptionError,
    TranslationEngineError,
    NoInputError,
    ConfigurationError,
    ServiceError,
    TimeoutError,
    ExportError,
    Busy,
    StateMismatchError,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ModelLoadError => "ModelLoadError",
            ErrorKind::TranscriptionError => "TranscriptionError",
            ErrorKind::TranslationEngineError => "TranslationEngineError",
            ErrorKind::NoInputError => "NoInputError",
            ErrorKind::ConfigurationError => "ConfigurationError",
            ErrorKind::ServiceError => "ServiceError",
            ErrorKind::TimeoutError => "TimeoutError",
            ErrorKind::ExportError => "ExportError",
            ErrorKind::Busy => "Busy",
            ErrorKind::StateMismatchError => "StateMismatchError",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job-level failure. Aborts the job that raised it and nothing else.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Failed to load speech model: {0}")]
    ModelLoad(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Translation engine unavailable: {0}")]
    TranslationEngine(String),

    #[error("{0}")]
    NoInput(String),

    #[error("{0}")]
    Configuration(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::ModelLoad(_) => ErrorKind::ModelLoadError,
            JobError::Transcription(_) => ErrorKind::TranscriptionError,
            JobError::TranslationEngine(_) => ErrorKind::TranslationEngineError,
            JobError::NoInput(_) => ErrorKind::NoInputError,
            JobError::Configuration(_) => ErrorKind::ConfigurationError,
            JobError::Service(_) => ErrorKind::ServiceError,
            JobError::Export(_) => ErrorKind::ExportError,
            JobError::Timeout(_) => ErrorKind::TimeoutError,
            // Never reported as a failure; the task runner turns it into `Cancelled`
            JobError::Cancelled | JobError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<SttError> for JobError {
    fn from(err: SttError) -> Self {
        if err.is_model_error() {
            JobError::ModelLoad(err.to_string())
        } else {
            JobError::Transcription(err.to_string())
        }
    }
}

impl From<LLMError> for JobError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::ConfigError(msg) => JobError::Configuration(msg),
            other => JobError::Service(other.to_string()),
        }
    }
}

impl From<MediaError> for JobError {
    fn from(err: MediaError) -> Self {
        JobError::Export(err.to_string())
    }
}

impl From<SrtError> for JobError {
    fn from(err: SrtError) -> Self {
        JobError::Export(err.to_string())
    }
}
