use crate::captions::CaptionSegment;
use crate::jobs::{Task, TaskEvent};
use crate::media::{MediaError, Muxer, PlaybackSink};
use crate::stt::{
    ModelSize, RawSegment, RawTranscript, SpeechEngine, SpeechModel, SpeechRequest, SttError,
};
use crate::summarize::{LLMAdapter, LLMError, LLMProvider};
use crate::translate::{TranslationEngine, TranslationError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Start `task` and collect its events up to and including the terminal one.
pub async fn run_to_end(mut task: Task) -> Vec<TaskEvent> {
    let mut rx = task.take_events().expect("task built with Task::new");
    task.start().expect("fresh task");

    let mut events = Vec::new();
    while let Some(envelope) = rx.recv().await {
        let terminal = envelope.event.is_terminal();
        events.push(envelope.event);
        if terminal {
            break;
        }
    }
    events
}

/// Block until the test hands out a permit. Each permit releases one call.
async fn pass(gate: &Option<Arc<Semaphore>>) {
    if let Some(gate) = gate {
        if let Ok(permit) = gate.acquire().await {
            permit.forget();
        }
    }
}

// ---------- speech ----------

#[derive(Clone, Default)]
pub struct MockSpeechEngine {
    segments: Vec<RawSegment>,
    language: Option<String>,
    fail_load: bool,
    fail_transcribe: bool,
    gate: Option<Arc<Semaphore>>,
    last_hint: Arc<Mutex<Option<String>>>,
    transcribe_calls: Arc<AtomicUsize>,
}

impl MockSpeechEngine {
    pub fn new(segments: Vec<(f64, f64, &str)>) -> Self {
        Self {
            segments: segments
                .into_iter()
                .map(|(start, end, text)| RawSegment {
                    start,
                    end,
                    text: text.to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_language(mut self, code: &str) -> Self {
        self.language = Some(code.to_string());
        self
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn failing_transcribe(mut self) -> Self {
        self.fail_transcribe = true;
        self
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn last_hint(&self) -> Option<String> {
        self.last_hint.lock().unwrap().clone()
    }

    pub fn transcribe_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.transcribe_calls)
    }
}

#[async_trait]
impl SpeechEngine for MockSpeechEngine {
    async fn load_model(&self, size: ModelSize) -> Result<Box<dyn SpeechModel>, SttError> {
        if self.fail_load {
            return Err(SttError::ModelLoad(format!("not enough memory for {}", size)));
        }
        Ok(Box::new(self.clone()))
    }

    fn name(&self) -> &str {
        "mock-speech"
    }
}

#[async_trait]
impl SpeechModel for MockSpeechEngine {
    async fn transcribe(&self, request: &SpeechRequest) -> Result<RawTranscript, SttError> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_hint.lock().unwrap() = request.language_hint.clone();
        pass(&self.gate).await;

        if self.fail_transcribe {
            return Err(SttError::EngineError("decoder crashed".to_string()));
        }

        Ok(RawTranscript {
            full_text: self
                .segments
                .iter()
                .map(|s| s.text.trim())
                .collect::<Vec<_>>()
                .join(" "),
            segments: self.segments.clone(),
            detected_language: self.language.clone(),
        })
    }
}

// ---------- translation ----------

/// Translates by reversing the characters of its input
#[derive(Default)]
pub struct ReverseTranslator {
    fail_on: Vec<String>,
    rejected_sources: Vec<String>,
    gate: Option<Arc<Semaphore>>,
    calls: Arc<AtomicUsize>,
    sources: Arc<Mutex<Vec<String>>>,
}

impl ReverseTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on.push(text.to_string());
        self
    }

    pub fn rejecting_source(mut self, code: &str) -> Self {
        self.rejected_sources.push(code.to_string());
        self
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn sources(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.sources)
    }
}

#[async_trait]
impl TranslationEngine for ReverseTranslator {
    async fn prepare(&self, source: &str, _target: &str) -> Result<(), TranslationError> {
        if self.rejected_sources.iter().any(|s| s == source) {
            return Err(TranslationError::UnsupportedLanguage(source.to_string()));
        }
        Ok(())
    }

    async fn translate(
        &self,
        text: &str,
        source: &str,
        _target: &str,
    ) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sources.lock().unwrap().push(source.to_string());
        pass(&self.gate).await;

        if self.fail_on.iter().any(|t| t == text) {
            return Err(TranslationError::NetworkError("connection reset".to_string()));
        }
        Ok(text.chars().rev().collect())
    }

    fn name(&self) -> &str {
        "reverse"
    }
}

// ---------- summarization ----------

#[derive(Clone)]
enum Reply {
    Text(String),
    RateLimited,
    Panic,
    Hang,
}

pub struct MockLLMProvider {
    reply: Reply,
    gate: Option<Arc<Semaphore>>,
    connect_calls: Arc<AtomicUsize>,
    generate_calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLLMProvider {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            gate: None,
            connect_calls: Arc::default(),
            generate_calls: Arc::default(),
            prompts: Arc::default(),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with_reply(Reply::Text(text.to_string()))
    }

    pub fn rate_limited() -> Self {
        Self::with_reply(Reply::RateLimited)
    }

    pub fn panicking() -> Self {
        Self::with_reply(Reply::Panic)
    }

    pub fn hanging() -> Self {
        Self::with_reply(Reply::Hang)
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn connect_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.connect_calls)
    }

    pub fn generate_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.generate_calls)
    }

    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }
}

impl LLMProvider for MockLLMProvider {
    fn connect(&self, _api_key: &str) -> Result<Box<dyn LLMAdapter>, LLMError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockLLMAdapter {
            reply: self.reply.clone(),
            gate: self.gate.clone(),
            generate_calls: Arc::clone(&self.generate_calls),
            prompts: Arc::clone(&self.prompts),
        }))
    }

    fn name(&self) -> &str {
        "mock-llm"
    }
}

struct MockLLMAdapter {
    reply: Reply,
    gate: Option<Arc<Semaphore>>,
    generate_calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl LLMAdapter for MockLLMAdapter {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        pass(&self.gate).await;

        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::RateLimited => Err(LLMError::RateLimitError("quota exhausted".to_string())),
            Reply::Panic => panic!("mock provider panic"),
            Reply::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "mock-llm"
    }
}

// ---------- media ----------

#[derive(Default)]
pub struct MockMuxer {
    fail: bool,
    gate: Option<Arc<Semaphore>>,
    subtitles_seen: Arc<Mutex<Vec<String>>>,
}

impl MockMuxer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Contents of every subtitle file handed to `mux`
    pub fn subtitles_seen(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.subtitles_seen)
    }
}

#[async_trait]
impl Muxer for MockMuxer {
    async fn mux(&self, video: &Path, subtitles: &Path, output: &Path) -> Result<(), MediaError> {
        let srt = std::fs::read_to_string(subtitles)?;
        self.subtitles_seen.lock().unwrap().push(srt);
        pass(&self.gate).await;

        if self.fail {
            return Err(MediaError::ProcessFailed("codec not supported".to_string()));
        }
        std::fs::copy(video, output)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "mock-muxer"
    }
}

#[derive(Debug, Default)]
pub struct RecordingPlayback {
    pub stops: usize,
    pub opened: Vec<(PathBuf, Option<PathBuf>)>,
    pub overlays: Vec<Vec<CaptionSegment>>,
    pub fail_open: bool,
}

impl PlaybackSink for RecordingPlayback {
    fn stop(&mut self) {
        self.stops += 1;
    }

    fn open(&mut self, video: &Path, subtitles: Option<&Path>) -> Result<(), String> {
        if self.fail_open {
            return Err("player refused the file".to_string());
        }
        self.opened
            .push((video.to_path_buf(), subtitles.map(Path::to_path_buf)));
        Ok(())
    }

    fn show_captions(&mut self, segments: &[CaptionSegment]) {
        self.overlays.push(segments.to_vec());
    }
}

/// A [`RecordingPlayback`] the test keeps a handle to after giving it away
#[derive(Clone, Default)]
pub struct SharedPlayback(pub Arc<Mutex<RecordingPlayback>>);

impl PlaybackSink for SharedPlayback {
    fn stop(&mut self) {
        self.0.lock().unwrap().stop();
    }

    fn open(&mut self, video: &Path, subtitles: Option<&Path>) -> Result<(), String> {
        self.0.lock().unwrap().open(video, subtitles)
    }

    fn show_captions(&mut self, segments: &[CaptionSegment]) {
        self.0.lock().unwrap().show_captions(segments);
    }
}
