use super::{with_timeout, ErrorKind, JobContext, JobError};
use crate::captions::{CaptionSegment, TranscriptResult, TranslationResult};
use crate::translate::languages::{self, AUTO_DETECT};
use crate::translate::TranslationEngine;
use std::sync::Arc;
use std::time::Duration;

pub struct TranslationJob {
    source: Arc<TranscriptResult>,
    target: String,
    engine: Arc<dyn TranslationEngine>,
    call_timeout: Duration,
}

impl TranslationJob {
    pub fn new(
        source: Arc<TranscriptResult>,
        target_language: &str,
        engine: Arc<dyn TranslationEngine>,
        call_timeout: Duration,
    ) -> Result<Self, JobError> {
        let target = target_language.trim();
        if target.is_empty() {
            return Err(JobError::NoInput("No target language selected".to_string()));
        }

        Ok(Self {
            source,
            target: target.to_string(),
            engine,
            call_timeout,
        })
    }

    pub(super) async fn run(self, ctx: &JobContext) -> Result<TranslationResult, JobError> {
        ctx.progress(10, format!("Preparing translation to '{}'...", self.target));

        let total = self.source.segments().len();
        if total == 0 {
            return Err(JobError::NoInput(
                "Transcript has no segments to translate".to_string(),
            ));
        }

        let source_lang = self.prepare(ctx).await?;
        tracing::info!(
            "Translating {} segments {} -> {} via {}",
            total,
            source_lang,
            self.target,
            self.engine.name()
        );

        let mut segments = Vec::with_capacity(total);
        for (i, segment) in self.source.segments().iter().enumerate() {
            ctx.checkpoint()?;

            let text = if segment.text.trim().is_empty() {
                String::new()
            } else {
                let attempt = tokio::select! {
                    _ = ctx.cancelled() => return Err(JobError::Cancelled),
                    result = self.translate_unit(&segment.text, source_lang) => result,
                };
                match attempt {
                    Ok(translated) => translated,
                    Err(reason) => {
                        ctx.warn(
                            ErrorKind::TranslationEngineError,
                            format!("Segment {} left untranslated: {}", segment.index, reason),
                        );
                        segment.text.clone()
                    }
                }
            };

            segments.push(CaptionSegment::new(segment.index, segment.start, segment.end, text));

            let percent = 10 + ((i + 1) * 80 / total) as u8;
            ctx.progress(percent, format!("Translated segment {}/{}", i + 1, total));
        }

        ctx.checkpoint()?;
        ctx.progress(95, "Finalizing translation...");
        let full_text = self.translate_document(ctx, &segments, source_lang).await?;

        ctx.progress(100, "Translation complete!");
        Ok(TranslationResult::new(full_text, segments, self.target))
    }

    /// Prepare the engine for the mapped source language, retrying with detection.
    async fn prepare(&self, ctx: &JobContext) -> Result<&'static str, JobError> {
        let mapped = languages::resolve_source(self.source.language_code());

        let first = self.prepare_pair(mapped).await;
        let err = match first {
            Ok(()) => return Ok(mapped),
            Err(e) => e,
        };

        if mapped == AUTO_DETECT {
            return Err(JobError::TranslationEngine(err));
        }

        ctx.warn(
            ErrorKind::TranslationEngineError,
            format!(
                "Source language '{}' rejected ({}); using automatic detection",
                mapped, err
            ),
        );
        self.prepare_pair(AUTO_DETECT)
            .await
            .map(|()| AUTO_DETECT)
            .map_err(JobError::TranslationEngine)
    }

    async fn prepare_pair(&self, source: &str) -> Result<(), String> {
        match with_timeout(self.call_timeout, self.engine.prepare(source, &self.target)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn translate_unit(&self, text: &str, source: &str) -> Result<String, String> {
        match with_timeout(self.call_timeout, self.engine.translate(text, source, &self.target)).await {
            Ok(Ok(translated)) => Ok(translated),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn translate_document(
        &self,
        ctx: &JobContext,
        segments: &[CaptionSegment],
        source: &str,
    ) -> Result<String, JobError> {
        let joined = || {
            segments
                .iter()
                .map(|s| s.text.as_str())
                .filter(|t| !t.trim().is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        };

        if self.source.full_text().trim().is_empty() {
            return Ok(joined());
        }

        let attempt = tokio::select! {
            _ = ctx.cancelled() => return Err(JobError::Cancelled),
            result = self.translate_unit(self.source.full_text(), source) => result,
        };

        Ok(match attempt {
            Ok(text) => text,
            Err(reason) => {
                ctx.warn(
                    ErrorKind::TranslationEngineError,
                    format!("Full text translation failed ({}); joining segments", reason),
                );
                joined()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{Job, JobOutput, Task, TaskEvent};
    use crate::testing::{run_to_end, ReverseTranslator};
    use std::sync::atomic::Ordering;

    fn transcript(language: &str) -> Arc<TranscriptResult> {
        Arc::new(TranscriptResult::new(
            "Hi Bye",
            vec![
                CaptionSegment::new(1, 0.0, 1.0, "Hi"),
                CaptionSegment::new(2, 1.0, 2.0, "Bye"),
            ],
            language,
        ))
    }

    fn job(source: Arc<TranscriptResult>, engine: ReverseTranslator) -> Job {
        Job::Translate(
            TranslationJob::new(source, "fr", Arc::new(engine), Duration::from_secs(5)).unwrap(),
        )
    }

    fn translation(events: &[TaskEvent]) -> &TranslationResult {
        match events.last() {
            Some(TaskEvent::Completed(JobOutput::Translation(t))) => t,
            other => panic!("unexpected terminal event: {:?}", other),
        }
    }

    #[test]
    fn test_blank_target_is_rejected() {
        let result = TranslationJob::new(
            transcript("en"),
            "  ",
            Arc::new(ReverseTranslator::new()),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(JobError::NoInput(_))));
    }

    #[tokio::test]
    async fn test_segments_translate_one_by_one() {
        let events = run_to_end(Task::new(job(transcript("en"), ReverseTranslator::new()))).await;
        let result = translation(&events);

        let got: Vec<(f64, f64, &str)> = result
            .segments()
            .iter()
            .map(|s| (s.start, s.end, s.text.as_str()))
            .collect();
        assert_eq!(got, vec![(0.0, 1.0, "iH"), (1.0, 2.0, "eyB")]);
        assert_eq!(result.segments()[1].index, 2);
        assert_eq!(result.full_text(), "eyB iH");
        assert_eq!(result.language_code(), "fr");

        let percents: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                TaskEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![10, 50, 90, 95, 100]);
    }

    #[tokio::test]
    async fn test_failed_segment_keeps_original_text() {
        let engine = ReverseTranslator::new().failing_on("Bye");
        let events = run_to_end(Task::new(job(transcript("en"), engine))).await;

        let warnings = events
            .iter()
            .filter(|e| matches!(e, TaskEvent::Warning { kind: ErrorKind::TranslationEngineError, .. }))
            .count();
        assert_eq!(warnings, 1);

        let result = translation(&events);
        assert_eq!(result.segments()[0].text, "iH");
        assert_eq!(result.segments()[1].text, "Bye");
    }

    #[tokio::test]
    async fn test_zero_segments_fails_with_no_input() {
        let empty = Arc::new(TranscriptResult::new("", vec![], "en"));
        let engine = ReverseTranslator::new();
        let calls = engine.calls();

        let events = run_to_end(Task::new(job(empty, engine))).await;
        assert!(matches!(
            events.last(),
            Some(TaskEvent::Failed { kind: ErrorKind::NoInputError, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unmapped_language_uses_detection() {
        let engine = ReverseTranslator::new();
        let sources = engine.sources();
        run_to_end(Task::new(job(transcript("unknown"), engine))).await;

        assert!(sources.lock().unwrap().iter().all(|s| s == AUTO_DETECT));
    }

    #[tokio::test]
    async fn test_rejected_source_falls_back_to_detection() {
        let engine = ReverseTranslator::new().rejecting_source("zh-CN");
        let sources = engine.sources();
        let events = run_to_end(Task::new(job(transcript("zh"), engine))).await;

        assert!(events.iter().any(|e| matches!(e, TaskEvent::Warning { .. })));
        assert!(matches!(events.last(), Some(TaskEvent::Completed(_))));
        assert!(sources.lock().unwrap().iter().all(|s| s == AUTO_DETECT));
    }

    #[tokio::test]
    async fn test_engine_that_rejects_everything_fails_job() {
        let engine = ReverseTranslator::new()
            .rejecting_source("en")
            .rejecting_source(AUTO_DETECT);
        let events = run_to_end(Task::new(job(transcript("en"), engine))).await;

        assert!(matches!(
            events.last(),
            Some(TaskEvent::Failed { kind: ErrorKind::TranslationEngineError, .. })
        ));
    }

    #[tokio::test]
    async fn test_blank_segment_is_not_sent() {
        let source = Arc::new(TranscriptResult::new(
            "",
            vec![
                CaptionSegment::new(1, 0.0, 1.0, "   "),
                CaptionSegment::new(2, 1.0, 2.0, "abc"),
            ],
            "en",
        ));
        let engine = ReverseTranslator::new();
        let calls = engine.calls();

        let events = run_to_end(Task::new(job(source, engine))).await;
        let result = translation(&events);

        assert_eq!(result.segments()[0].text, "");
        assert_eq!(result.full_text(), "cba");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
