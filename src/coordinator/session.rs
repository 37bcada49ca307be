use crate::captions::{CaptionSegment, CaptionSource, TranscriptResult, TranslationResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Identifies one stored transcript for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TranscriptId(u64);

impl std::fmt::Display for TranscriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transcript#{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("{what} was derived from {origin:?}, but the current transcript is {current:?}")]
    StateMismatch {
        what: &'static str,
        origin: Option<TranscriptId>,
        current: Option<TranscriptId>,
    },
}

#[derive(Debug, Default)]
pub struct SessionState {
    video_path: Option<PathBuf>,
    transcript: Option<(TranscriptId, Arc<TranscriptResult>)>,
    translation: Option<(TranscriptId, Arc<TranslationResult>)>,
    summary: Option<(Option<TranscriptId>, String)>,
    next_id: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video_path(&self) -> Option<&Path> {
        self.video_path.as_deref()
    }

    pub fn transcript(&self) -> Option<&Arc<TranscriptResult>> {
        self.transcript.as_ref().map(|(_, t)| t)
    }

    pub fn transcript_id(&self) -> Option<TranscriptId> {
        self.transcript.as_ref().map(|(id, _)| *id)
    }

    pub fn translation(&self) -> Option<&Arc<TranslationResult>> {
        self.translation.as_ref().map(|(_, t)| t)
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_ref().map(|(_, s)| s.as_str())
    }

    /// Switch to a new video. Everything derived from the previous one is dropped.
    pub fn load_video(&mut self, path: impl Into<PathBuf>) {
        self.video_path = Some(path.into());
        self.transcript = None;
        self.translation = None;
        self.summary = None;
    }

    /// Store a transcript; translation and summary of the replaced one are dropped.
    pub fn set_transcript(&mut self, transcript: Arc<TranscriptResult>) -> TranscriptId {
        self.next_id += 1;
        let id = TranscriptId(self.next_id);
        self.transcript = Some((id, transcript));
        self.translation = None;
        self.summary = None;
        id
    }

    pub fn apply_translation(
        &mut self,
        origin: Option<TranscriptId>,
        translation: Arc<TranslationResult>,
    ) -> Result<(), SessionError> {
        match (origin, self.transcript_id()) {
            (Some(origin), Some(current)) if origin == current => {
                self.translation = Some((origin, translation));
                Ok(())
            }
            (origin, current) => Err(SessionError::StateMismatch {
                what: "translation",
                origin,
                current,
            }),
        }
    }

    pub fn apply_summary(
        &mut self,
        origin: Option<TranscriptId>,
        summary: String,
    ) -> Result<(), SessionError> {
        let current = self.transcript_id();
        if origin != current {
            return Err(SessionError::StateMismatch {
                what: "summary",
                origin,
                current,
            });
        }
        self.summary = Some((origin, summary));
        Ok(())
    }

    /// Captions to show or embed: the translation when present, else the transcript.
    pub fn preferred_captions(&self) -> Option<(CaptionSource, &[CaptionSegment])> {
        if let Some(t) = self.translation().filter(|t| !t.is_empty()) {
            return Some((CaptionSource::Translated, t.segments()));
        }
        self.captions(CaptionSource::Original)
            .map(|segments| (CaptionSource::Original, segments))
    }

    /// Non-empty caption track of the given source
    pub fn captions(&self, source: CaptionSource) -> Option<&[CaptionSegment]> {
        let segments = match source {
            CaptionSource::Original => self.transcript().map(|t| t.segments()),
            CaptionSource::Translated => self.translation().map(|t| t.segments()),
        };
        segments.filter(|s| !s.is_empty())
    }
}
