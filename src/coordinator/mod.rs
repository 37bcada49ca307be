mod events;
mod handle;
mod metrics;
mod session;

pub use events::CoordinatorEvent;
pub use handle::JobHandle;
pub use metrics::Metrics;
pub use session::{SessionError, SessionState, TranscriptId};

use crate::captions::export::default_video_filename;
use crate::captions::srt::{self, SrtError};
use crate::captions::{CaptionSource, TranscriptResult};
use crate::config::AppConfig;
use crate::engines::Engines;
use crate::jobs::{
    ErrorKind, ExportJob, ExportParams, Job, JobError, JobId, JobKind, JobOutput,
    SummarizationJob, Task, TaskEnvelope, TaskError, TaskEvent, TranscriptionJob,
    TranscriptionParams, TranslationJob,
};
use crate::media::{PlaybackSink, SidecarError, SidecarManager};
use crate::stt::ModelSize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// What the UI asks for. Inputs not listed here come from the session.
#[derive(Debug, Clone)]
pub enum JobRequest {
    Transcribe {
        model_size: ModelSize,
        source_language: Option<String>,
    },
    Translate {
        target_language: String,
    },
    Summarize,
    Export {
        /// Defaults to `{stem}_with_{source}_subs.mp4` next to the video
        output_path: Option<PathBuf>,
        /// Defaults to the preferred captions (translation first)
        source: Option<CaptionSource>,
    },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Transcribe { .. } => JobKind::Transcribe,
            JobRequest::Translate { .. } => JobKind::Translate,
            JobRequest::Summarize => JobKind::Summarize,
            JobRequest::Export { .. } => JobKind::Export,
        }
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("A {0} job is already running")]
    Busy(JobKind),

    #[error("No video loaded")]
    NoVideo,

    #[error("Video not found: {0}")]
    VideoNotFound(PathBuf),

    #[error("No transcript available; transcribe the video first")]
    NoTranscript,

    #[error("No {0} captions available")]
    NoCaptions(CaptionSource),

    #[error("No playback component registered")]
    NoPlayback,

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error("Could not read subtitles: {0}")]
    Subtitles(#[from] SrtError),
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::Busy(_) => ErrorKind::Busy,
            CoordinatorError::NoVideo
            | CoordinatorError::VideoNotFound(_)
            | CoordinatorError::NoTranscript
            | CoordinatorError::NoCaptions(_)
            | CoordinatorError::Subtitles(_) => ErrorKind::NoInputError,
            CoordinatorError::Job(e) => e.kind(),
            CoordinatorError::Sidecar(_) => ErrorKind::ExportError,
            CoordinatorError::NoPlayback | CoordinatorError::Task(_) => ErrorKind::Internal,
        }
    }
}

struct ActiveJob {
    task: Task,
    handle: JobHandle,
    /// Transcript the job's input was taken from
    origin: Option<TranscriptId>,
    /// Cancelled by a video load. Keeps the slot busy until the worker stops;
    /// nothing it reports is applied to the session.
    abandoned: bool,
}

/// Single owner of the session. Runs at most one job per kind and applies
/// their results in the order they arrive.
pub struct JobCoordinator {
    engines: Engines,
    config: AppConfig,
    session: SessionState,
    slots: HashMap<JobKind, ActiveJob>,
    inbox_tx: mpsc::UnboundedSender<TaskEnvelope>,
    inbox_rx: mpsc::UnboundedReceiver<TaskEnvelope>,
    subscribers: Vec<mpsc::UnboundedSender<CoordinatorEvent>>,
    metrics: Metrics,
    playback: Option<Box<dyn PlaybackSink>>,
    sidecar: SidecarManager,
}

impl JobCoordinator {
    pub fn new(engines: Engines, config: AppConfig) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let sidecar = SidecarManager::new(config.scratch_dir());

        Self {
            engines,
            config,
            session: SessionState::new(),
            slots: HashMap::new(),
            inbox_tx,
            inbox_rx,
            subscribers: Vec::new(),
            metrics: Metrics::new(),
            playback: None,
            sidecar,
        }
    }

    /// Register the external video player
    pub fn with_playback(mut self, playback: Box<dyn PlaybackSink>) -> Self {
        self.playback = Some(playback);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CoordinatorEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn is_running(&self, kind: JobKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn is_idle(&self) -> bool {
        self.slots.is_empty()
    }

    /// Handle of the running job of `kind`; `None` when idle
    pub fn status(&self, kind: JobKind) -> Option<JobHandle> {
        self.slots.get(&kind).map(|active| {
            let mut handle = active.handle.clone();
            handle.status = active.task.status();
            handle
        })
    }

    /// Start a job. Rejected with `Busy` while a job of the same kind runs.
    pub fn submit(&mut self, request: JobRequest) -> Result<JobId, CoordinatorError> {
        let kind = request.kind();
        if self.is_running(kind) {
            tracing::warn!("Rejecting {} request: a job of that kind is running", kind);
            return Err(CoordinatorError::Busy(kind));
        }

        let (job, origin) = self.build_job(request)?;
        let mut task = Task::with_sender(job, self.inbox_tx.clone());
        task.start()?;

        let id = task.id();
        self.slots.insert(
            kind,
            ActiveJob {
                task,
                handle: JobHandle::running(id, kind),
                origin,
                abandoned: false,
            },
        );
        self.publish(CoordinatorEvent::Started { job_id: id, kind });
        Ok(id)
    }

    fn build_job(&self, request: JobRequest) -> Result<(Job, Option<TranscriptId>), CoordinatorError> {
        let origin = self.session.transcript_id();

        let job = match request {
            JobRequest::Transcribe {
                model_size,
                source_language,
            } => {
                let video_path = self.require_video()?.to_path_buf();
                let params = TranscriptionParams {
                    video_path,
                    model_size,
                    source_language,
                };
                Job::Transcribe(TranscriptionJob::new(params, Arc::clone(&self.engines.speech))?)
            }
            JobRequest::Translate { target_language } => {
                let transcript = self
                    .session
                    .transcript()
                    .ok_or(CoordinatorError::NoTranscript)?;
                Job::Translate(TranslationJob::new(
                    Arc::clone(transcript),
                    &target_language,
                    Arc::clone(&self.engines.translator),
                    self.config.translation_timeout(),
                )?)
            }
            JobRequest::Summarize => {
                let text = self
                    .session
                    .transcript()
                    .map(|t| t.full_text().to_string())
                    .unwrap_or_default();
                Job::Summarize(SummarizationJob::new(
                    text,
                    self.config.gemini_api_key.clone(),
                    Arc::clone(&self.engines.summarizer),
                    self.config.summarization_timeout(),
                ))
            }
            JobRequest::Export {
                output_path,
                source,
            } => {
                let video_path = self.require_video()?.to_path_buf();
                let (source, segments) = match source {
                    Some(source) => (
                        source,
                        self.session
                            .captions(source)
                            .ok_or(CoordinatorError::NoCaptions(source))?,
                    ),
                    None => self
                        .session
                        .preferred_captions()
                        .ok_or(CoordinatorError::NoCaptions(CaptionSource::Original))?,
                };
                let output_path = output_path.unwrap_or_else(|| {
                    video_path.with_file_name(default_video_filename(&video_path, source))
                });
                let params = ExportParams {
                    video_path,
                    output_path,
                    segments: segments.to_vec(),
                    source,
                };
                Job::Export(ExportJob::new(
                    params,
                    Arc::clone(&self.engines.muxer),
                    self.config.scratch_dir(),
                )?)
            }
        };

        Ok((job, origin))
    }

    fn require_video(&self) -> Result<&Path, CoordinatorError> {
        self.session.video_path().ok_or(CoordinatorError::NoVideo)
    }

    /// Request cancellation of the running job of `kind`. The slot stays busy
    /// until the job reports back.
    pub fn cancel(&mut self, kind: JobKind) -> bool {
        match self.slots.get(&kind) {
            Some(active) => {
                active.task.cancel();
                true
            }
            None => false,
        }
    }

    /// Switch to a new video: running jobs are cancelled and everything derived
    /// from the previous video is dropped. Their slots stay busy until the old
    /// workers stop.
    pub fn load_video(&mut self, path: impl Into<PathBuf>) -> Result<(), CoordinatorError> {
        let path = path.into();
        if !path.is_file() {
            return Err(CoordinatorError::VideoNotFound(path));
        }

        self.abandon_all_jobs();
        self.session.load_video(path.clone());
        self.sidecar.clear();

        if let Some(playback) = self.playback.as_mut() {
            playback.stop();
            if let Err(e) = playback.open(&path, None) {
                tracing::warn!("Playback could not open {}: {}", path.display(), e);
            }
        }

        tracing::info!("Video loaded: {}", path.display());
        self.publish(CoordinatorEvent::VideoLoaded { path });
        Ok(())
    }

    /// Reopen the video on the player with the preferred captions as a sidecar file.
    pub fn attach_captions(&mut self) -> Result<PathBuf, CoordinatorError> {
        let playback = self.playback.as_mut().ok_or(CoordinatorError::NoPlayback)?;
        let video = self
            .session
            .video_path()
            .ok_or(CoordinatorError::NoVideo)?;
        let (source, segments) = self
            .session
            .preferred_captions()
            .ok_or(CoordinatorError::NoCaptions(CaptionSource::Original))?;

        let path = self.sidecar.attach(video, segments, playback.as_mut())?;
        self.publish(CoordinatorEvent::CaptionsAttached {
            path: path.clone(),
            source,
        });
        Ok(path)
    }

    /// Use an existing SubRip file as the transcript instead of running
    /// speech-to-text. Replaces any current transcript and its derived results.
    pub fn import_subtitles(
        &mut self,
        path: &Path,
        language: Option<&str>,
    ) -> Result<TranscriptId, CoordinatorError> {
        if self.is_running(JobKind::Transcribe) {
            return Err(CoordinatorError::Busy(JobKind::Transcribe));
        }
        self.require_video()?;

        let segments = srt::read_file(path)?;
        if segments.is_empty() {
            return Err(CoordinatorError::NoCaptions(CaptionSource::Original));
        }
        let full_text = segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let language = language
            .map(str::trim)
            .filter(|l| !l.eq_ignore_ascii_case("auto"))
            .unwrap_or_default();

        let transcript = Arc::new(TranscriptResult::new(full_text, segments, language));
        let id = self.session.set_transcript(Arc::clone(&transcript));
        if let Some(playback) = self.playback.as_mut() {
            playback.show_captions(transcript.segments());
        }

        tracing::info!(
            "Imported {} segments from {}",
            transcript.segments().len(),
            path.display()
        );
        self.publish(CoordinatorEvent::CaptionsImported {
            path: path.to_path_buf(),
            segments: transcript.segments().len(),
        });
        Ok(id)
    }

    /// Cancel everything, remove the sidecar and stop playback.
    pub fn shutdown(&mut self) {
        self.abandon_all_jobs();
        self.sidecar.clear();
        if let Some(playback) = self.playback.as_mut() {
            playback.stop();
        }
        tracing::info!("Coordinator shut down");
    }

    /// Wait for one job event and apply it. Returns `false` once no job is
    /// running and nothing is queued.
    pub async fn process_next(&mut self) -> bool {
        if let Ok(envelope) = self.inbox_rx.try_recv() {
            self.handle_envelope(envelope);
            return true;
        }
        if self.slots.is_empty() {
            return false;
        }
        match self.inbox_rx.recv().await {
            Some(envelope) => {
                self.handle_envelope(envelope);
                true
            }
            None => false,
        }
    }

    /// Apply every queued job event without waiting. Returns how many were handled.
    pub fn poll_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(envelope) = self.inbox_rx.try_recv() {
            self.handle_envelope(envelope);
            handled += 1;
        }
        handled
    }

    /// Process events until no job is running.
    pub async fn wait_idle(&mut self) {
        while self.process_next().await {}
    }

    fn abandon_all_jobs(&mut self) {
        for active in self.slots.values_mut().filter(|active| !active.abandoned) {
            active.task.cancel();
            active.abandoned = true;
            tracing::info!(
                "Abandoning {} job {}; slot busy until it stops",
                active.handle.kind,
                active.handle.id
            );
        }
    }

    fn handle_envelope(&mut self, envelope: TaskEnvelope) {
        let TaskEnvelope {
            job_id,
            kind,
            event,
        } = envelope;

        let abandoned = match self.slots.get(&kind) {
            Some(active) if active.task.id() == job_id => active.abandoned,
            _ => {
                tracing::debug!("Dropping stale event from {} job {}", kind, job_id);
                return;
            }
        };
        if abandoned {
            self.finish_abandoned(job_id, kind, event);
            return;
        }

        match event {
            TaskEvent::Progress { percent, message } => {
                if let Some(active) = self.slots.get_mut(&kind) {
                    active.handle.record_progress(percent, &message);
                }
                self.publish(CoordinatorEvent::Progress {
                    job_id,
                    kind,
                    percent,
                    message,
                });
            }
            TaskEvent::Warning {
                kind: error_kind,
                message,
            } => {
                self.publish(CoordinatorEvent::Warning {
                    job_id,
                    kind,
                    error_kind,
                    message,
                });
            }
            TaskEvent::Completed(output) => {
                let origin = self.slots.remove(&kind).and_then(|active| active.origin);
                self.apply_output(job_id, kind, origin, output);
            }
            TaskEvent::Failed {
                kind: error_kind,
                message,
            } => {
                self.slots.remove(&kind);
                self.metrics.record_failure(kind);
                self.publish(CoordinatorEvent::Failed {
                    job_id,
                    kind,
                    error_kind,
                    message,
                });
            }
            TaskEvent::Cancelled => {
                self.slots.remove(&kind);
                self.metrics.record_cancelled(kind);
                self.publish(CoordinatorEvent::Cancelled { job_id, kind });
            }
        }
    }

    /// Terminal event of a job cancelled by a video load. Only an export that
    /// already wrote its file reports success; other results are dropped.
    fn finish_abandoned(&mut self, job_id: JobId, kind: JobKind, event: TaskEvent) {
        match event {
            TaskEvent::Progress { .. } | TaskEvent::Warning { .. } => {
                tracing::debug!("Ignoring progress of abandoned {} job {}", kind, job_id);
            }
            TaskEvent::Completed(JobOutput::Exported { path, source }) => {
                self.slots.remove(&kind);
                let message = exported_message(&path, source);
                tracing::info!("Abandoned {} job {} had committed: {}", kind, job_id, message);
                self.metrics.record_success(kind);
                self.publish(CoordinatorEvent::Succeeded {
                    job_id,
                    kind,
                    message,
                });
            }
            TaskEvent::Failed {
                kind: error_kind,
                message,
            } => {
                self.slots.remove(&kind);
                self.metrics.record_failure(kind);
                self.publish(CoordinatorEvent::Failed {
                    job_id,
                    kind,
                    error_kind,
                    message,
                });
            }
            TaskEvent::Completed(_) | TaskEvent::Cancelled => {
                self.slots.remove(&kind);
                tracing::info!("Abandoned {} job {} stopped", kind, job_id);
                self.metrics.record_cancelled(kind);
                self.publish(CoordinatorEvent::Cancelled { job_id, kind });
            }
        }
    }

    fn apply_output(
        &mut self,
        job_id: JobId,
        kind: JobKind,
        origin: Option<TranscriptId>,
        output: JobOutput,
    ) {
        let applied: Result<String, SessionError> = match output {
            JobOutput::Transcript(transcript) => {
                let transcript = Arc::new(transcript);
                self.session.set_transcript(Arc::clone(&transcript));
                if let Some(playback) = self.playback.as_mut() {
                    playback.show_captions(transcript.segments());
                }
                Ok(if transcript.is_empty() {
                    "Transcription complete: no speech detected".to_string()
                } else {
                    format!(
                        "Transcription complete: {} segments (language: {})",
                        transcript.segments().len(),
                        transcript.language_code()
                    )
                })
            }
            JobOutput::Translation(translation) => {
                let translation = Arc::new(translation);
                self.session
                    .apply_translation(origin, Arc::clone(&translation))
                    .map(|()| {
                        format!(
                            "Translation to '{}' complete: {} segments",
                            translation.language_code(),
                            translation.segments().len()
                        )
                    })
            }
            JobOutput::Summary(summary) => {
                let chars = summary.chars().count();
                self.session
                    .apply_summary(origin, summary)
                    .map(|()| format!("Summary ready ({} characters)", chars))
            }
            JobOutput::Exported { path, source } => Ok(exported_message(&path, source)),
        };

        match applied {
            Ok(message) => {
                tracing::info!("{} job {} succeeded: {}", kind, job_id, message);
                self.metrics.record_success(kind);
                self.publish(CoordinatorEvent::Succeeded {
                    job_id,
                    kind,
                    message,
                });
                if kind == JobKind::Translate {
                    self.refresh_playback_captions();
                }
            }
            Err(e) => {
                tracing::warn!("Discarding {} result of job {}: {}", kind, job_id, e);
                self.metrics.record_failure(kind);
                self.publish(CoordinatorEvent::Failed {
                    job_id,
                    kind,
                    error_kind: ErrorKind::StateMismatchError,
                    message: e.to_string(),
                });
            }
        }
    }

    fn refresh_playback_captions(&mut self) {
        let Some(playback) = self.playback.as_mut() else {
            return;
        };
        if let Some((_, segments)) = self.session.preferred_captions() {
            playback.show_captions(segments);
        }
        if let Err(e) = self.attach_captions() {
            tracing::warn!("Could not attach captions to playback: {}", e);
        }
    }

    fn publish(&mut self, event: CoordinatorEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn exported_message(path: &Path, source: CaptionSource) -> String {
    format!("Video with {} subtitles exported to {}", source, path.display())
}

impl Drop for JobCoordinator {
    fn drop(&mut self) {
        for active in self.slots.values() {
            active.task.cancel();
        }
    }
}
