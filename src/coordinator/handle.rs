use crate::jobs::{JobId, JobKind, JobStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress_percent: u8,
    pub progress_message: String,
    pub started_at: DateTime<Utc>,
}

impl JobHandle {
    pub(crate) fn running(id: JobId, kind: JobKind) -> Self {
        Self {
            id,
            kind,
            status: JobStatus::Running,
            progress_percent: 0,
            progress_message: String::new(),
            started_at: Utc::now(),
        }
    }

    pub(crate) fn record_progress(&mut self, percent: u8, message: &str) {
        self.progress_percent = percent.min(100);
        self.progress_message = message.to_string();
    }

    pub fn elapsed_secs(&self) -> f64 {
        (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
