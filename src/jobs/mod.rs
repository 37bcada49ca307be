mod error;
mod export;
mod summarization;
mod task;
mod transcription;
mod translation;

pub use error::{ErrorKind, JobError};
pub use export::{ExportJob, ExportParams};
pub use summarization::SummarizationJob;
pub use task::{JobContext, JobId, JobStatus, Task, TaskEnvelope, TaskError, TaskEvent};
pub use transcription::{TranscriptionJob, TranscriptionParams};
pub use translation::TranslationJob;

use crate::captions::{CaptionSource, TranscriptResult, TranslationResult};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JobKind {
    Transcribe,
    Translate,
    Summarize,
    Export,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Transcribe => "transcribe",
            JobKind::Translate => "translate",
            JobKind::Summarize => "summarize",
            JobKind::Export => "export",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value carried by a `Completed` event
#[derive(Debug, Clone)]
pub enum JobOutput {
    Transcript(TranscriptResult),
    Translation(TranslationResult),
    Summary(String),
    Exported { path: PathBuf, source: CaptionSource },
}

impl JobOutput {
    pub fn kind(&self) -> JobKind {
        match self {
            JobOutput::Transcript(_) => JobKind::Transcribe,
            JobOutput::Translation(_) => JobKind::Translate,
            JobOutput::Summary(_) => JobKind::Summarize,
            JobOutput::Exported { .. } => JobKind::Export,
        }
    }
}

/// A validated, not yet started unit of work
pub enum Job {
    Transcribe(TranscriptionJob),
    Translate(TranslationJob),
    Summarize(SummarizationJob),
    Export(ExportJob),
}

impl Job {
    pub fn kind(&self) -> JobKind {
        match self {
            Job::Transcribe(_) => JobKind::Transcribe,
            Job::Translate(_) => JobKind::Translate,
            Job::Summarize(_) => JobKind::Summarize,
            Job::Export(_) => JobKind::Export,
        }
    }

    async fn run(self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        match self {
            Job::Transcribe(job) => job.run(ctx).await.map(JobOutput::Transcript),
            Job::Translate(job) => job.run(ctx).await.map(JobOutput::Translation),
            Job::Summarize(job) => job.run(ctx).await.map(JobOutput::Summary),
            Job::Export(job) => job.run(ctx).await,
        }
    }
}

/// Bound a network call. `limit` of zero disables the bound.
pub(crate) async fn with_timeout<T, E, F>(limit: Duration, call: F) -> Result<Result<T, E>, JobError>
where
    F: Future<Output = Result<T, E>>,
{
    if limit.is_zero() {
        return Ok(call.await);
    }
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| JobError::Timeout(limit.as_secs()))
}
