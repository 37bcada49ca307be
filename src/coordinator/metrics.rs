use crate::jobs::JobKind;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct Metrics {
    success_counts: HashMap<JobKind, u64>,
    failure_counts: HashMap<JobKind, u64>,
    cancelled_counts: HashMap<JobKind, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, kind: JobKind) {
        *self.success_counts.entry(kind).or_insert(0) += 1;
    }

    pub fn record_failure(&mut self, kind: JobKind) {
        *self.failure_counts.entry(kind).or_insert(0) += 1;
    }

    pub fn record_cancelled(&mut self, kind: JobKind) {
        *self.cancelled_counts.entry(kind).or_insert(0) += 1;
    }

    pub fn success_count(&self, kind: JobKind) -> u64 {
        *self.success_counts.get(&kind).unwrap_or(&0)
    }

    pub fn failure_count(&self, kind: JobKind) -> u64 {
        *self.failure_counts.get(&kind).unwrap_or(&0)
    }

    pub fn cancelled_count(&self, kind: JobKind) -> u64 {
        *self.cancelled_counts.get(&kind).unwrap_or(&0)
    }

    /// Successes over finished jobs, cancellations excluded
    pub fn success_rate(&self, kind: JobKind) -> f32 {
        let success = self.success_count(kind) as f32;
        let total = success + self.failure_count(kind) as f32;

        if total == 0.0 {
            0.0
        } else {
            success / total
        }
    }
}
