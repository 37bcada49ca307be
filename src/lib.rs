pub mod captions;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod engines;
pub mod jobs;
pub mod media;
pub mod stt;
pub mod summarize;
pub mod translate;

#[cfg(test)]
mod testing;

pub use captions::{CaptionSegment, CaptionSource, TranscriptResult, TranslationResult};
pub use config::AppConfig;
pub use coordinator::{CoordinatorError, CoordinatorEvent, JobCoordinator, JobHandle, JobRequest};
pub use engines::Engines;
pub use jobs::{ErrorKind, JobKind, JobStatus};
pub use media::PlaybackSink;
