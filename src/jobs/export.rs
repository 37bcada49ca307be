use super::{JobContext, JobError, JobOutput};
use crate::captions::{srt, CaptionSegment, CaptionSource};
use crate::media::Muxer;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ExportParams {
    pub video_path: PathBuf,
    pub output_path: PathBuf,
    pub segments: Vec<CaptionSegment>,
    pub source: CaptionSource,
}

pub struct ExportJob {
    params: ExportParams,
    muxer: Arc<dyn Muxer>,
    scratch_dir: PathBuf,
}

/// Removes the scratch subtitle file on every exit path
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = std::fs::remove_file(&self.0) {
                tracing::warn!("Could not remove scratch file {}: {}", self.0.display(), e);
            }
        }
    }
}

impl ExportJob {
    pub fn new(
        params: ExportParams,
        muxer: Arc<dyn Muxer>,
        scratch_dir: impl AsRef<Path>,
    ) -> Result<Self, JobError> {
        if params.segments.is_empty() {
            return Err(JobError::NoInput("No captions to embed".to_string()));
        }
        if !params.video_path.is_file() {
            return Err(JobError::NoInput(format!(
                "Video not found: {}",
                params.video_path.display()
            )));
        }
        if params.output_path == params.video_path {
            return Err(JobError::Export(
                "Output path must differ from the source video".to_string(),
            ));
        }

        Ok(Self {
            params,
            muxer,
            scratch_dir: scratch_dir.as_ref().to_path_buf(),
        })
    }

    pub(super) async fn run(self, ctx: &JobContext) -> Result<JobOutput, JobError> {
        ctx.progress(10, "Writing subtitle track...");
        let scratch = ScratchFile(
            self.scratch_dir
                .join(format!("caption_lab_export_{}.srt", ctx.job_id().simple())),
        );
        srt::write_file(&scratch.0, &self.params.segments)?;
        ctx.checkpoint()?;

        ctx.progress(30, format!("Embedding {} subtitles...", self.params.source));
        self.muxer
            .mux(&self.params.video_path, &scratch.0, &self.params.output_path)
            .await?;
        // The file on disk is the result now; a late cancel must not hide it
        ctx.mark_committed();

        tracing::info!(
            "Exported {} with {} subtitles via {}",
            self.params.output_path.display(),
            self.params.source,
            self.muxer.name()
        );
        ctx.progress(100, "Export complete!");

        Ok(JobOutput::Exported {
            path: self.params.output_path,
            source: self.params.source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{ErrorKind, Job, Task, TaskEvent};
    use crate::testing::{run_to_end, MockMuxer};

    fn fixture() -> (tempfile::TempDir, ExportParams) {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        std::fs::write(&video, b"video").unwrap();
        let params = ExportParams {
            output_path: dir.path().join("talk_with_translated_subs.mp4"),
            video_path: video,
            segments: vec![
                CaptionSegment::new(1, 0.0, 1.0, "iH"),
                CaptionSegment::new(2, 1.0, 2.0, "eyB"),
            ],
            source: CaptionSource::Translated,
        };
        (dir, params)
    }

    fn srt_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().map_or(false, |x| x == "srt"))
            .count()
    }

    #[test]
    fn test_empty_segments_are_rejected() {
        let (dir, mut params) = fixture();
        params.segments.clear();
        let result = ExportJob::new(params, Arc::new(MockMuxer::default()), dir.path());
        assert!(matches!(result, Err(JobError::NoInput(_))));
    }

    #[tokio::test]
    async fn test_export_muxes_and_removes_scratch_file() {
        let (dir, params) = fixture();
        let output = params.output_path.clone();
        let muxer = MockMuxer::default();
        let seen = muxer.subtitles_seen();
        let job = ExportJob::new(params, Arc::new(muxer), dir.path()).unwrap();

        let events = run_to_end(Task::new(Job::Export(job))).await;

        assert!(matches!(
            events.last(),
            Some(TaskEvent::Completed(JobOutput::Exported { path, source: CaptionSource::Translated })) if *path == output
        ));
        assert!(output.exists());
        assert_eq!(srt_files(dir.path()), 0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("00:00:01,000 --> 00:00:02,000\neyB"));
    }

    #[tokio::test]
    async fn test_mux_failure_still_removes_scratch_file() {
        let (dir, params) = fixture();
        let job = ExportJob::new(params, Arc::new(MockMuxer::failing()), dir.path()).unwrap();

        let events = run_to_end(Task::new(Job::Export(job))).await;

        assert!(matches!(
            events.last(),
            Some(TaskEvent::Failed { kind: ErrorKind::ExportError, .. })
        ));
        assert_eq!(srt_files(dir.path()), 0);
    }
}
