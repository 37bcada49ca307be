pub mod export;
pub mod srt;

use serde::{Deserialize, Serialize};

/// Language code used when the speech engine could not detect one
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// A timestamped span of caption text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    /// 1-based position within its document
    pub index: u32,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds (never before `start`)
    pub end: f64,
    pub text: String,
}

impl CaptionSegment {
    pub fn new(index: u32, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    pub fn contains(&self, time_secs: f64) -> bool {
        self.start <= time_secs && time_secs <= self.end
    }
}

/// Result of a successful transcription. Only built through [`TranscriptResult::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptResult {
    full_text: String,
    segments: Vec<CaptionSegment>,
    /// Detected language, `"unknown"` if the engine reported none
    language_code: String,
}

impl TranscriptResult {
    /// Build a transcript from engine output, ordering segments by start time.
    pub fn new(
        full_text: impl Into<String>,
        segments: Vec<CaptionSegment>,
        language_code: impl Into<String>,
    ) -> Self {
        let language_code = language_code.into();
        let language_code = if language_code.trim().is_empty() {
            UNKNOWN_LANGUAGE.to_string()
        } else {
            language_code.trim().to_string()
        };

        Self {
            full_text: full_text.into().trim().to_string(),
            segments: normalize_segments(segments),
            language_code,
        }
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn segments(&self) -> &[CaptionSegment] {
        &self.segments
    }

    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment displayed at `time_secs`, if any
    pub fn segment_at(&self, time_secs: f64) -> Option<&CaptionSegment> {
        self.segments.iter().find(|s| s.contains(time_secs))
    }
}

/// Translated captions, positionally aligned with the transcript they came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationResult {
    full_text: String,
    segments: Vec<CaptionSegment>,
    /// Target language of the translation
    language_code: String,
}

impl TranslationResult {
    pub fn new(
        full_text: impl Into<String>,
        segments: Vec<CaptionSegment>,
        language_code: impl Into<String>,
    ) -> Self {
        Self {
            full_text: full_text.into(),
            segments,
            language_code: language_code.into(),
        }
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn segments(&self) -> &[CaptionSegment] {
        &self.segments
    }

    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Which caption track a consumer is working with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionSource {
    Original,
    Translated,
}

impl CaptionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionSource::Original => "original",
            CaptionSource::Translated => "translated",
        }
    }
}

impl std::fmt::Display for CaptionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_segments(mut segments: Vec<CaptionSegment>) -> Vec<CaptionSegment> {
    for segment in segments.iter_mut() {
        if !segment.start.is_finite() || segment.start < 0.0 {
            segment.start = 0.0;
        }
        if !segment.end.is_finite() || segment.end < segment.start {
            segment.end = segment.start;
        }
        segment.text = segment.text.trim().to_string();
    }

    // Stable sort keeps engine order for equal start times
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));

    for (position, segment) in segments.iter_mut().enumerate() {
        segment.index = position as u32 + 1;
    }

    segments
}
