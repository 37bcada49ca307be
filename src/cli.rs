use crate::captions::export::{
    default_subtitle_filename, default_summary_filename, export_subtitles, export_summary,
};
use crate::captions::{CaptionSegment, CaptionSource};
use crate::config::AppConfig;
use crate::coordinator::{CoordinatorEvent, JobCoordinator, JobRequest};
use crate::engines::Engines;
use crate::jobs::JobKind;
use crate::stt::ModelSize;
use crate::translate::languages::TARGET_LANGUAGES;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Transcribe, translate, summarize and subtitle videos")]
pub struct Cli {
    /// Video file to process
    #[arg(required_unless_present = "list_languages")]
    pub video: Option<PathBuf>,

    /// JSON config file, created with defaults if missing
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Speech model size: tiny, base, small, medium, large
    #[arg(long)]
    pub model: Option<ModelSize>,

    /// Spoken language code, or "auto"
    #[arg(long, default_value = "auto")]
    pub language: String,

    /// Use an existing SubRip file as the transcript instead of transcribing
    #[arg(long)]
    pub subtitles: Option<PathBuf>,

    /// Translate captions into this language code
    #[arg(long)]
    pub translate: Option<String>,

    /// Summarize the transcript
    #[arg(long)]
    pub summarize: bool,

    /// Write captions as SubRip: `--srt` next to the video, `--srt=PATH` elsewhere
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub srt: Option<String>,

    /// Write the summary as text: `--summary-out` next to the video, `--summary-out=PATH` elsewhere
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub summary_out: Option<String>,

    /// Re-mux the video with an embedded subtitle track, `--embed=PATH` to pick the output
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub embed: Option<String>,

    /// Caption track to export; the translation when present otherwise
    #[arg(long, value_enum)]
    pub captions: Option<CaptionArg>,

    /// Print supported translation targets and exit
    #[arg(long)]
    pub list_languages: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CaptionArg {
    Original,
    Translated,
}

impl From<CaptionArg> for CaptionSource {
    fn from(arg: CaptionArg) -> Self {
        match arg {
            CaptionArg::Original => CaptionSource::Original,
            CaptionArg::Translated => CaptionSource::Translated,
        }
    }
}

pub async fn run(cli: Cli) -> Result<(), String> {
    if cli.list_languages {
        for (code, name) in TARGET_LANGUAGES {
            println!("{:<6} {}", code, name);
        }
        return Ok(());
    }

    let video = cli
        .video
        .clone()
        .ok_or_else(|| "No video given".to_string())?;
    let config = AppConfig::load(cli.config.as_deref())?;
    let engines = Engines::from_config(&config)?;
    let model_size = cli.model.unwrap_or(config.default_model_size);

    let mut coordinator = JobCoordinator::new(engines, config);
    let printer = tokio::spawn(print_events(coordinator.subscribe()));

    let result = drive(&mut coordinator, &cli, &video, model_size).await;

    coordinator.shutdown();
    drop(coordinator);
    let _ = printer.await;
    result
}

async fn drive(
    coordinator: &mut JobCoordinator,
    cli: &Cli,
    video: &Path,
    model_size: ModelSize,
) -> Result<(), String> {
    coordinator.load_video(video).map_err(|e| e.to_string())?;

    match &cli.subtitles {
        Some(path) => {
            coordinator
                .import_subtitles(path, Some(&cli.language))
                .map_err(|e| e.to_string())?;
        }
        None => {
            coordinator
                .submit(JobRequest::Transcribe {
                    model_size,
                    source_language: Some(cli.language.clone()),
                })
                .map_err(|e| e.to_string())?;
            coordinator.wait_idle().await;
            require_success(coordinator, &[JobKind::Transcribe])?;
        }
    }

    // Translation and summarization run side by side
    let mut submitted = Vec::new();
    if let Some(target) = &cli.translate {
        coordinator
            .submit(JobRequest::Translate {
                target_language: target.clone(),
            })
            .map_err(|e| e.to_string())?;
        submitted.push(JobKind::Translate);
    }
    if cli.summarize {
        coordinator
            .submit(JobRequest::Summarize)
            .map_err(|e| e.to_string())?;
        submitted.push(JobKind::Summarize);
    }
    coordinator.wait_idle().await;
    require_success(coordinator, &submitted)?;

    if let Some(path) = &cli.srt {
        let (source, segments) = pick_captions(coordinator, cli.captions)?;
        let session = coordinator.session();
        let language = match source {
            CaptionSource::Original => session.transcript().map(|t| t.language_code().to_string()),
            CaptionSource::Translated => session.translation().map(|t| t.language_code().to_string()),
        }
        .unwrap_or_default();
        let path = or_default(path, video, || default_subtitle_filename(Some(video), &language));
        export_subtitles(&path, &segments).map_err(|e| e.to_string())?;
        println!("Subtitles written to {}", path.display());
    }

    if let Some(path) = &cli.summary_out {
        let summary = coordinator
            .session()
            .summary()
            .ok_or_else(|| "No summary available; pass --summarize".to_string())?
            .to_string();
        let path = or_default(path, video, || default_summary_filename(Some(video)));
        export_summary(&path, &summary).map_err(|e| e.to_string())?;
        println!("Summary written to {}", path.display());
    }

    if let Some(path) = &cli.embed {
        let output_path = Some(path.trim())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        coordinator
            .submit(JobRequest::Export {
                output_path,
                source: cli.captions.map(CaptionSource::from),
            })
            .map_err(|e| e.to_string())?;
        coordinator.wait_idle().await;
        require_success(coordinator, &[JobKind::Export])?;
    }

    Ok(())
}

/// Each CLI run submits a kind at most once, so no success means it failed or was cancelled
fn require_success(coordinator: &JobCoordinator, kinds: &[JobKind]) -> Result<(), String> {
    let failed: Vec<&str> = kinds
        .iter()
        .filter(|kind| coordinator.metrics().success_count(**kind) == 0)
        .map(|kind| kind.as_str())
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(format!("Job(s) did not succeed: {}", failed.join(", ")))
    }
}

fn pick_captions(
    coordinator: &JobCoordinator,
    choice: Option<CaptionArg>,
) -> Result<(CaptionSource, Vec<CaptionSegment>), String> {
    let session = coordinator.session();
    let picked = match choice {
        Some(arg) => {
            let source = CaptionSource::from(arg);
            session.captions(source).map(|segments| (source, segments))
        }
        None => session.preferred_captions(),
    };
    picked
        .map(|(source, segments)| (source, segments.to_vec()))
        .ok_or_else(|| "No captions to export".to_string())
}

/// An empty path means "use the default name next to the video"
fn or_default(path: &str, video: &Path, default_name: impl FnOnce() -> String) -> PathBuf {
    let path = path.trim();
    if path.is_empty() {
        video.with_file_name(default_name())
    } else {
        PathBuf::from(path)
    }
}

async fn print_events(mut events: mpsc::UnboundedReceiver<CoordinatorEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            CoordinatorEvent::Started { kind, .. } => println!("[{}] started", kind),
            CoordinatorEvent::Progress {
                kind,
                percent,
                message,
                ..
            } => println!("[{}] {:>3}% {}", kind, percent, message),
            CoordinatorEvent::Warning { kind, message, .. } => {
                println!("[{}] warning: {}", kind, message)
            }
            CoordinatorEvent::Succeeded { kind, message, .. } => println!("[{}] {}", kind, message),
            CoordinatorEvent::Failed {
                kind,
                error_kind,
                message,
                ..
            } => println!("[{}] failed ({}): {}", kind, error_kind, message),
            CoordinatorEvent::Cancelled { kind, .. } => println!("[{}] cancelled", kind),
            CoordinatorEvent::VideoLoaded { path } => println!("Loaded {}", path.display()),
            CoordinatorEvent::CaptionsAttached { path, source } => {
                println!("Attached {} captions: {}", source, path.display())
            }
            CoordinatorEvent::CaptionsImported { path, segments } => {
                println!("Imported {} segments from {}", segments, path.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLLMProvider, MockMuxer, MockSpeechEngine, ReverseTranslator};
    use std::sync::Arc;

    fn coordinator(dir: &Path, summarizer: MockLLMProvider, muxer: MockMuxer) -> JobCoordinator {
        let engines = Engines {
            speech: Arc::new(MockSpeechEngine::new(vec![(0.0, 1.0, "Hi")]).with_language("en")),
            translator: Arc::new(ReverseTranslator::new()),
            summarizer: Arc::new(summarizer),
            muxer: Arc::new(muxer),
        };
        let config = AppConfig {
            gemini_api_key: Some("test-key".to_string()),
            scratch_dir: Some(dir.to_path_buf()),
            ..AppConfig::default()
        };
        JobCoordinator::new(engines, config)
    }

    fn video_in(dir: &Path) -> PathBuf {
        let video = dir.join("talk.mp4");
        std::fs::write(&video, b"video").unwrap();
        video
    }

    fn args(video: &Path, extra: &[&str]) -> Cli {
        let video = video.to_string_lossy().into_owned();
        let mut argv = vec!["caption-lab".to_string(), video];
        argv.extend(extra.iter().map(|a| a.to_string()));
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_writes_translated_srt() {
        let dir = tempfile::tempdir().unwrap();
        let video = video_in(dir.path());
        let mut coordinator =
            coordinator(dir.path(), MockLLMProvider::replying("s"), MockMuxer::default());
        let cli = args(&video, &["--translate", "fr", "--summarize", "--srt"]);

        drive(&mut coordinator, &cli, &video, ModelSize::Base)
            .await
            .unwrap();

        let srt = std::fs::read_to_string(dir.path().join("talk_subs_fr.srt")).unwrap();
        assert!(srt.contains("iH"));
        assert_eq!(coordinator.session().summary(), Some("s"));
    }

    #[tokio::test]
    async fn test_failed_job_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let video = video_in(dir.path());
        let mut coordinator =
            coordinator(dir.path(), MockLLMProvider::rate_limited(), MockMuxer::default());
        let cli = args(&video, &["--translate", "fr", "--summarize", "--srt"]);

        let err = drive(&mut coordinator, &cli, &video, ModelSize::Base)
            .await
            .unwrap_err();

        assert!(err.contains("summarize"));
        assert!(!err.contains("translate"));
        assert!(!dir.path().join("talk_subs_fr.srt").exists());
    }

    #[tokio::test]
    async fn test_failed_embed_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let video = video_in(dir.path());
        let mut coordinator =
            coordinator(dir.path(), MockLLMProvider::replying("s"), MockMuxer::failing());
        let cli = args(&video, &["--embed"]);

        let err = drive(&mut coordinator, &cli, &video, ModelSize::Base)
            .await
            .unwrap_err();
        assert!(err.contains("export"));
    }

    #[tokio::test]
    async fn test_existing_subtitles_skip_transcription() {
        let dir = tempfile::tempdir().unwrap();
        let video = video_in(dir.path());
        let subs = dir.path().join("talk.srt");
        std::fs::write(&subs, "1\n00:00:00,000 --> 00:00:02,000\nBonjour\n").unwrap();
        let mut coordinator =
            coordinator(dir.path(), MockLLMProvider::replying("s"), MockMuxer::default());
        let subtitles_arg = format!("--subtitles={}", subs.display());
        let cli = args(&video, &[subtitles_arg.as_str(), "--language", "fr"]);

        drive(&mut coordinator, &cli, &video, ModelSize::Base)
            .await
            .unwrap();

        let transcript = coordinator.session().transcript().unwrap();
        assert_eq!(transcript.full_text(), "Bonjour");
        assert_eq!(transcript.language_code(), "fr");
        assert_eq!(coordinator.metrics().success_count(JobKind::Transcribe), 0);
    }

    #[test]
    fn test_optional_paths_do_not_swallow_the_video() {
        let cli = Cli::try_parse_from(["caption-lab", "--srt", "talk.mp4"]).unwrap();
        assert_eq!(cli.video, Some(PathBuf::from("talk.mp4")));
        assert_eq!(cli.srt.as_deref(), Some(""));

        let cli = Cli::try_parse_from(["caption-lab", "--summary-out=notes.txt", "talk.mp4"]).unwrap();
        assert_eq!(cli.summary_out.as_deref(), Some("notes.txt"));
        assert_eq!(cli.video, Some(PathBuf::from("talk.mp4")));
    }

    #[test]
    fn test_parse_full_pipeline() {
        let cli = Cli::try_parse_from([
            "caption-lab",
            "talk.mp4",
            "--model",
            "small",
            "--translate",
            "fr",
            "--summarize",
            "--srt",
            "--embed=out.mp4",
            "--captions",
            "original",
        ])
        .unwrap();

        assert_eq!(cli.video, Some(PathBuf::from("talk.mp4")));
        assert_eq!(cli.model, Some(ModelSize::Small));
        assert_eq!(cli.translate.as_deref(), Some("fr"));
        assert!(cli.summarize);
        assert_eq!(cli.srt.as_deref(), Some(""));
        assert_eq!(cli.embed.as_deref(), Some("out.mp4"));
        assert!(cli.summary_out.is_none());
        assert!(matches!(cli.captions, Some(CaptionArg::Original)));
    }

    #[test]
    fn test_video_is_required() {
        assert!(Cli::try_parse_from(["caption-lab"]).is_err());
        assert!(Cli::try_parse_from(["caption-lab", "--list-languages"]).is_ok());
        assert!(Cli::try_parse_from(["caption-lab", "a.mp4", "--model", "huge"]).is_err());
    }

    #[test]
    fn test_empty_path_uses_default_name() {
        let video = Path::new("/videos/talk.mp4");
        assert_eq!(
            or_default("", video, || "talk_summary.txt".to_string()),
            PathBuf::from("/videos/talk_summary.txt")
        );
        assert_eq!(
            or_default("/tmp/x.txt", video, || unreachable!()),
            PathBuf::from("/tmp/x.txt")
        );
    }
}
