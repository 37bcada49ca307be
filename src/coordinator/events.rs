use crate::captions::CaptionSource;
use crate::jobs::{ErrorKind, JobId, JobKind};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CoordinatorEvent {
    Started {
        job_id: JobId,
        kind: JobKind,
    },
    Progress {
        job_id: JobId,
        kind: JobKind,
        percent: u8,
        message: String,
    },
    Warning {
        job_id: JobId,
        kind: JobKind,
        error_kind: ErrorKind,
        message: String,
    },
    Succeeded {
        job_id: JobId,
        kind: JobKind,
        message: String,
    },
    Failed {
        job_id: JobId,
        kind: JobKind,
        error_kind: ErrorKind,
        message: String,
    },
    Cancelled {
        job_id: JobId,
        kind: JobKind,
    },
    VideoLoaded {
        path: PathBuf,
    },
    CaptionsAttached {
        path: PathBuf,
        source: CaptionSource,
    },
    /// An existing SubRip file became the transcript
    CaptionsImported {
        path: PathBuf,
        segments: usize,
    },
}

impl CoordinatorEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CoordinatorEvent::Succeeded { .. }
                | CoordinatorEvent::Failed { .. }
                | CoordinatorEvent::Cancelled { .. }
        )
    }
}
