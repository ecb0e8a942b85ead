//! Orchestration of user actions and the single error boundary in front of them.

use console::style;
use std::path::PathBuf;
use std::sync::Arc;

use crate::captions::{CaptionOutcome, CaptionPipeline, GoogleTranslator, SpeechRecognizer, Translator, WhisperCli};
use crate::cli::CaptionFormat;
use crate::config::Config;
use crate::media::{EncodeTarget, FfmpegBackend, MediaBackend};
use crate::resolver::{ExtractionBackend, ResolvedVideo, Resolver, YtDlpBackend};
use crate::storage::{InputBackupEntry, Persistence, VideoRecord};
use crate::transcode::{TranscodeOutcome, TranscodePipeline};
use crate::{utils, PipelineStage, Result, VidscribeError};

/// External collaborators the application drives
#[derive(Clone)]
pub struct Backends {
    pub extraction: Arc<dyn ExtractionBackend>,
    pub media: Arc<dyn MediaBackend>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub translator: Arc<dyn Translator>,
}

impl Backends {
    /// Command-line tools and HTTP services named in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            extraction: Arc::new(YtDlpBackend::new(&config.resolver.yt_dlp_path)),
            media: Arc::new(FfmpegBackend::new(&config.transcode.ffmpeg_path)),
            recognizer: Arc::new(WhisperCli::new(&config.captions.whisper_path, &config.captions.model)),
            translator: Arc::new(GoogleTranslator::new(&config.captions.translate_endpoint)?),
        })
    }
}

/// One resolved video together with its stored record
#[derive(Debug, Clone)]
pub struct Submission {
    pub video: ResolvedVideo,
    pub record: VideoRecord,
}

pub struct App {
    config: Config,
    persistence: Persistence,
    resolver: Resolver,
    captions: CaptionPipeline,
    transcoder: TranscodePipeline,
}

impl App {
    pub fn new(config: Config, persistence: Persistence, backends: Backends, show_progress: bool) -> Self {
        let resolver = Resolver::new(backends.extraction.clone(), config.resolver.url_template.clone());

        let captions = CaptionPipeline::new(
            backends.extraction.clone(),
            backends.media.clone(),
            backends.recognizer,
            backends.translator,
            config.captions.target_language.clone(),
        )
        .with_temp_parent(config.app.temp_dir.clone())
        .with_progress(show_progress);

        let transcoder = TranscodePipeline::new(backends.extraction, backends.media)
            .with_temp_parent(config.app.temp_dir.clone())
            .with_progress(show_progress);

        Self {
            config,
            persistence,
            resolver,
            captions,
            transcoder,
        }
    }

    pub fn from_config(config: Config, show_progress: bool) -> Result<Self> {
        let backends = Backends::from_config(&config)?;
        let persistence = Persistence::from_config(&config.storage);
        Ok(Self::new(config, persistence, backends, show_progress))
    }

    /// Back up the raw input, resolve it and store the result
    ///
    /// The backup entry is written first and stays even when resolution fails.
    pub async fn submit(&self, raw: &str) -> Result<Submission> {
        self.persistence.record_input(raw)?;

        let video = self.resolver.resolve(raw).await?;
        let record = self
            .persistence
            .upsert_video(&video.identifier, &video.canonical_url, &video.author)?;

        Ok(Submission { video, record })
    }

    /// Resolve `raw` and generate captions for it
    pub async fn generate_captions(
        &self,
        raw: &str,
        output: Option<PathBuf>,
        format: &CaptionFormat,
        language: Option<&str>,
    ) -> Result<(Submission, CaptionOutcome)> {
        let submission = self.submit(raw).await?;
        let extension = format!("{}.{}", self.config.captions.target_language, format.extension());
        let output = output.unwrap_or_else(|| utils::default_output_name(&submission.video.identifier, &extension));

        let outcome = self
            .captions
            .generate(&submission.video.canonical_url, language, &output, format)
            .await?;

        Ok((submission, outcome))
    }

    /// Resolve `raw` and convert it to another container
    pub async fn transcode(
        &self,
        raw: &str,
        output: Option<PathBuf>,
        container: Option<&str>,
    ) -> Result<(Submission, TranscodeOutcome)> {
        let submission = self.submit(raw).await?;

        let mut target = EncodeTarget::from_config(&self.config.transcode);
        if let Some(container) = container {
            target = target.with_container(container);
        }
        let output = output.unwrap_or_else(|| utils::default_output_name(&submission.video.identifier, &target.container));

        let outcome = self
            .transcoder
            .run(&submission.video.canonical_url, &target, &output)
            .await?;

        Ok((submission, outcome))
    }

    pub fn videos(&self) -> Result<Vec<VideoRecord>> {
        self.persistence.list_videos()
    }

    pub fn backups(&self) -> Result<Vec<InputBackupEntry>> {
        self.persistence.list_backups()
    }
}

/// What the user is told about a failed action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub headline: String,
    pub detail: String,
    pub hint: Option<String>,
}

/// Map any failure to a user-facing message
pub fn describe_failure(err: &anyhow::Error) -> FailureReport {
    let detail = format!("{:#}", err);

    match err.downcast_ref::<VidscribeError>() {
        Some(VidscribeError::Resolution(_)) => FailureReport {
            headline: "Error processing video".to_string(),
            detail,
            hint: Some(
                "Make sure yt-dlp supports this site. If not, you may need to update yt-dlp \
                 or find another way to extract the video URL."
                    .to_string(),
            ),
        },
        Some(VidscribeError::Pipeline { stage, .. }) => FailureReport {
            headline: format!("Processing failed during {}", stage),
            detail,
            hint: Some(stage_hint(*stage).to_string()),
        },
        Some(VidscribeError::Persistence(_)) => FailureReport {
            headline: "Could not update local records".to_string(),
            detail,
            hint: Some("Check that the storage paths in the configuration are writable.".to_string()),
        },
        Some(VidscribeError::Config(_)) => FailureReport {
            headline: "Invalid configuration".to_string(),
            detail,
            hint: Some("Run `vidscribe config` to locate the configuration file.".to_string()),
        },
        None => FailureReport {
            headline: "Unexpected error".to_string(),
            detail,
            hint: None,
        },
    }
}

fn stage_hint(stage: PipelineStage) -> &'static str {
    match stage {
        PipelineStage::Download => "The video could not be downloaded; it may have been removed or need a newer yt-dlp.",
        PipelineStage::AudioExtraction | PipelineStage::Encoding => {
            "ffmpeg could not process the video; check that ffmpeg is installed with the required codecs."
        }
        PipelineStage::Transcription => "Whisper failed; check that it is installed and the model can be loaded.",
        PipelineStage::Translation => "The translation service did not answer; try again later.",
        PipelineStage::Output => "The result could not be written; check the output path.",
    }
}

/// Print a failure to stderr
pub fn report_failure(err: &anyhow::Error) {
    let report = describe_failure(err);
    tracing::debug!("Action failed: {:?}", err);

    eprintln!("{} {}", style("✗").red().bold(), style(&report.headline).red().bold());
    eprintln!("  {}", report.detail);
    if let Some(hint) = report.hint {
        eprintln!("  {}", style(hint).dim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::{MockTranslator, Transcription};
    use crate::media::MockMediaBackend;
    use crate::resolver::MockExtractionBackend;
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    struct SilentRecognizer;

    #[async_trait]
    impl SpeechRecognizer for SilentRecognizer {
        async fn transcribe(&self, _audio_path: &Path, _language: Option<&str>) -> Result<Transcription> {
            Ok(Transcription::default())
        }
    }

    fn app_with(dir: &TempDir, extraction: MockExtractionBackend, media: MockMediaBackend) -> App {
        let mut config = Config::default();
        config.storage.database_path = dir.path().join("videos.db");
        config.storage.backup_path = dir.path().join("backup.json");
        config.app.temp_dir = Some(dir.path().join("tmp"));

        let persistence = Persistence::from_config(&config.storage);
        let backends = Backends {
            extraction: Arc::new(extraction),
            media: Arc::new(media),
            recognizer: Arc::new(SilentRecognizer),
            translator: Arc::new(MockTranslator::new()),
        };
        App::new(config, persistence, backends, false)
    }

    fn extraction_ok() -> MockExtractionBackend {
        let mut extraction = MockExtractionBackend::new();
        extraction.expect_backend_name().return_const("mock");
        extraction
            .expect_extract_info()
            .with(eq("https://hsex.icu/video-1123503.htm"))
            .returning(|_| {
                Ok(json!({
                    "url": "https://cdn.example.com/1123503.mp4",
                    "title": "Sample",
                    "uploader": "Alice"
                }))
            });
        extraction
    }

    #[tokio::test]
    async fn test_successful_submission_stores_row_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(&dir, extraction_ok(), MockMediaBackend::new());

        let submission = app.submit("1123503").await.unwrap();
        assert_eq!(submission.video.canonical_url, "https://hsex.icu/video-1123503.htm");
        assert_eq!(submission.record.identifier, "1123503");
        assert_eq!(submission.record.source_url, "https://hsex.icu/video-1123503.htm");
        assert_eq!(submission.record.author, "Alice");

        // Resolving again updates the same row
        app.submit("1123503").await.unwrap();
        assert_eq!(app.videos().unwrap().len(), 1);
        assert_eq!(app.backups().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_submission_is_still_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut extraction = MockExtractionBackend::new();
        extraction.expect_backend_name().return_const("mock");
        extraction
            .expect_extract_info()
            .returning(|_| Err(anyhow::anyhow!("ERROR: Unable to download webpage")));
        let app = app_with(&dir, extraction, MockMediaBackend::new());

        let err = app.submit("1123503").await.unwrap_err();

        assert!(app.videos().unwrap().is_empty());
        let backups = app.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].raw_input, "1123503");

        let report = describe_failure(&err);
        assert_eq!(report.headline, "Error processing video");
        assert!(report.detail.contains("Unable to download webpage"));
        assert!(report.hint.unwrap().contains("yt-dlp"));
    }

    #[tokio::test]
    async fn test_failed_transcode_keeps_stored_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut extraction = extraction_ok();
        extraction.expect_download().returning(|_, path| {
            fs_err::write(path, b"video")?;
            Ok(())
        });
        let mut media = MockMediaBackend::new();
        media
            .expect_transcode()
            .returning(|_, _, _| Err(anyhow::anyhow!("Unknown encoder 'libxvid'")));
        let app = app_with(&dir, extraction, media);

        let output = dir.path().join("out.avi");
        let err = app.transcode("1123503", Some(output.clone()), None).await.unwrap_err();

        let report = describe_failure(&err);
        assert_eq!(report.headline, "Processing failed during encoding");
        assert!(report.detail.contains("libxvid"));
        assert_eq!(app.videos().unwrap().len(), 1);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_captions_for_silent_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut extraction = extraction_ok();
        extraction.expect_download().returning(|_, path| {
            fs_err::write(path, b"video")?;
            Ok(())
        });
        let mut media = MockMediaBackend::new();
        media.expect_extract_audio().returning(|_, out| {
            fs_err::write(out, b"RIFF")?;
            Ok(())
        });
        let app = app_with(&dir, extraction, media);

        let output = dir.path().join("captions.vtt");
        let (submission, outcome) = app
            .generate_captions("1123503", Some(output.clone()), &CaptionFormat::Vtt, None)
            .await
            .unwrap();

        assert_eq!(submission.video.identifier, "1123503");
        assert!(!outcome.translated);
        assert_eq!(fs_err::read_to_string(&output).unwrap(), "WEBVTT\n\n");
    }

    #[test]
    fn test_unknown_errors_have_no_hint() {
        let report = describe_failure(&anyhow::anyhow!("boom"));
        assert_eq!(report.headline, "Unexpected error");
        assert_eq!(report.detail, "boom");
        assert!(report.hint.is_none());
    }
}
