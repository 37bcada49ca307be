use super::error::{ErrorKind, JobError};
use super::{Job, JobKind, JobOutput};
use serde::Serialize;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub enum TaskEvent {
    Progress { percent: u8, message: String },
    /// Recovered per-unit failure; the job keeps going
    Warning { kind: ErrorKind, message: String },
    Completed(JobOutput),
    Failed { kind: ErrorKind, message: String },
    Cancelled,
}

impl TaskEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskEvent::Completed(_) | TaskEvent::Failed { .. } | TaskEvent::Cancelled
        )
    }
}

/// An event tagged with the job that produced it
#[derive(Debug, Clone)]
pub struct TaskEnvelope {
    pub job_id: JobId,
    pub kind: JobKind,
    pub event: TaskEvent,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task {0} was already started")]
    AlreadyStarted(JobId),
}

struct ContextInner {
    job_id: JobId,
    kind: JobKind,
    tx: mpsc::UnboundedSender<TaskEnvelope>,
    token: CancellationToken,
    closed: AtomicBool,
    committed: AtomicBool,
    last_percent: AtomicU8,
}

/// Handle a running job uses to report progress and observe cancellation
#[derive(Clone)]
pub struct JobContext {
    inner: Arc<ContextInner>,
}

impl JobContext {
    fn new(
        job_id: JobId,
        kind: JobKind,
        tx: mpsc::UnboundedSender<TaskEnvelope>,
        token: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                job_id,
                kind,
                tx,
                token,
                closed: AtomicBool::new(false),
                committed: AtomicBool::new(false),
                last_percent: AtomicU8::new(0),
            }),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.inner.job_id
    }

    /// Report progress. Percentages above 100 are clamped and never move backwards.
    pub fn progress(&self, percent: u8, message: impl Into<String>) {
        let percent = percent.min(100).max(self.inner.last_percent.load(Ordering::Relaxed));
        self.inner.last_percent.store(percent, Ordering::Relaxed);
        self.emit(TaskEvent::Progress {
            percent,
            message: message.into(),
        });
    }

    pub fn warn(&self, kind: ErrorKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("Job {} ({}): {}", self.inner.job_id, self.inner.kind, message);
        self.emit(TaskEvent::Warning { kind, message });
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Bail out with [`JobError::Cancelled`] if cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), JobError> {
        if self.is_cancelled() {
            Err(JobError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }

    /// The job has produced an external side effect; its result is reported
    /// even if cancellation arrives afterwards.
    pub fn mark_committed(&self) {
        self.inner.committed.store(true, Ordering::SeqCst);
    }

    fn is_committed(&self) -> bool {
        self.inner.committed.load(Ordering::SeqCst)
    }

    fn emit(&self, event: TaskEvent) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }
        self.send(event);
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    fn send(&self, event: TaskEvent) {
        // A dropped receiver means nobody listens any more
        let _ = self.inner.tx.send(TaskEnvelope {
            job_id: self.inner.job_id,
            kind: self.inner.kind,
            event,
        });
    }
}

/// One unit of cancellable background work
pub struct Task {
    id: JobId,
    kind: JobKind,
    job: Option<Job>,
    token: CancellationToken,
    status: Arc<Mutex<JobStatus>>,
    tx: mpsc::UnboundedSender<TaskEnvelope>,
    rx: Option<mpsc::UnboundedReceiver<TaskEnvelope>>,
}

impl Task {
    /// Create a task with its own event channel, see [`Task::take_events`].
    pub fn new(job: Job) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut task = Self::with_sender(job, tx);
        task.rx = Some(rx);
        task
    }

    /// Create a task that reports into a shared channel.
    pub fn with_sender(job: Job, tx: mpsc::UnboundedSender<TaskEnvelope>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: job.kind(),
            job: Some(job),
            token: CancellationToken::new(),
            status: Arc::new(Mutex::new(JobStatus::Pending)),
            tx,
            rx: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn status(&self) -> JobStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Receiver for a task built with [`Task::new`]. Returns `None` on later calls.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<TaskEnvelope>> {
        self.rx.take()
    }

    /// Spawn the job on its own worker. Must be called inside a tokio runtime.
    pub fn start(&mut self) -> Result<(), TaskError> {
        let job = self.job.take().ok_or(TaskError::AlreadyStarted(self.id))?;

        set_status(&self.status, JobStatus::Running);
        let ctx = JobContext::new(self.id, self.kind, self.tx.clone(), self.token.clone());
        let status = Arc::clone(&self.status);

        tracing::info!("Starting {} job {}", self.kind, self.id);
        tokio::spawn(drive(job, ctx, status));
        Ok(())
    }

    /// Request cooperative cancellation. Best effort: a job inside an opaque
    /// engine call finishes that call first.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("Cancel requested for {} job {}", self.kind, self.id);
        }
        self.token.cancel();
    }
}

fn set_status(status: &Mutex<JobStatus>, value: JobStatus) {
    *status.lock().unwrap_or_else(|e| e.into_inner()) = value;
}

async fn drive(job: Job, ctx: JobContext, status: Arc<Mutex<JobStatus>>) {
    let body_ctx = ctx.clone();
    let outcome = tokio::spawn(async move { job.run(&body_ctx).await }).await;

    // Nothing the job body still holds may emit after this point
    ctx.close();

    let discard = ctx.is_cancelled() && !ctx.is_committed();
    let (final_status, event) = match outcome {
        Ok(_) if discard => (JobStatus::Cancelled, TaskEvent::Cancelled),
        Ok(Ok(output)) => (JobStatus::Succeeded, TaskEvent::Completed(output)),
        Ok(Err(JobError::Cancelled)) => (JobStatus::Cancelled, TaskEvent::Cancelled),
        Ok(Err(err)) => (
            JobStatus::Failed,
            TaskEvent::Failed {
                kind: err.kind(),
                message: err.to_string(),
            },
        ),
        Err(join_err) => {
            let message = if join_err.is_panic() {
                format!("job panicked: {}", panic_message(join_err.into_panic()))
            } else {
                "job worker was aborted".to_string()
            };
            tracing::error!("Job {} ({}): {}", ctx.job_id(), ctx.inner.kind, message);
            (
                JobStatus::Failed,
                TaskEvent::Failed {
                    kind: ErrorKind::Internal,
                    message,
                },
            )
        }
    };

    match &event {
        TaskEvent::Failed { kind, message } => {
            tracing::warn!("Job {} failed [{}]: {}", ctx.job_id(), kind, message)
        }
        TaskEvent::Cancelled => tracing::info!("Job {} cancelled", ctx.job_id()),
        _ => tracing::info!("Job {} completed", ctx.job_id()),
    }

    set_status(&status, final_status);
    ctx.send(event);
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
