use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod translate;
pub mod whisper;

pub use translate::GoogleTranslator;
pub use whisper::WhisperCli;

use crate::cli::CaptionFormat;
use crate::media::MediaBackend;
use crate::resolver::ExtractionBackend;
use crate::utils;
use crate::{PipelineStage, Result, VidscribeError};

/// Individual caption with timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    /// Start time in seconds
    pub start_seconds: f64,

    /// End time in seconds
    pub end_seconds: f64,

    /// Caption text
    pub text: String,
}

/// Output of the speech recognizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    /// Detected or requested language tag
    pub language: Option<String>,

    /// Segments in recognizer order
    pub segments: Vec<CaptionSegment>,
}

/// Contract of the external speech-recognition backend
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe an audio file, detecting the language unless one is given
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcription>;
}

/// Contract of the external translation backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one piece of text into `target_language`
    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Primary subtag of a language tag, lowercased (`en-US` -> `en`)
fn primary_language(tag: &str) -> String {
    tag.trim()
        .split(|c: char| c == '-' || c == '_')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// Whether text in `detected` must be translated to reach `target`
///
/// A recognizer that reports no language is taken to have heard the target language.
pub fn needs_translation(detected: Option<&str>, target: &str) -> bool {
    match detected {
        Some(lang) if !lang.trim().is_empty() => primary_language(lang) != primary_language(target),
        _ => false,
    }
}

/// Enforce start <= end and non-decreasing start order
pub fn normalize_segments(mut segments: Vec<CaptionSegment>) -> Vec<CaptionSegment> {
    for segment in &mut segments {
        if segment.end_seconds < segment.start_seconds {
            tracing::warn!(
                "Segment ends before it starts ({:.3} < {:.3}), clamping",
                segment.end_seconds,
                segment.start_seconds
            );
            segment.end_seconds = segment.start_seconds;
        }
    }
    // Stable, so recognizer order is kept for equal starts
    segments.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
    segments
}

/// Translate each segment one request at a time when the language differs from `target`
pub async fn translate_segments(
    translator: &dyn Translator,
    transcription: Transcription,
    target: &str,
) -> Result<Vec<CaptionSegment>> {
    if !needs_translation(transcription.language.as_deref(), target) {
        return Ok(transcription.segments);
    }

    let mut translated = Vec::with_capacity(transcription.segments.len());
    for segment in transcription.segments {
        let text = segment.text.trim();
        let text = if text.is_empty() {
            String::new()
        } else {
            translator.translate(text, target).await?
        };
        translated.push(CaptionSegment { text, ..segment });
    }

    Ok(translated)
}

/// Result of a caption run
#[derive(Debug, Clone)]
pub struct CaptionOutcome {
    /// Language the recognizer reported
    pub language: Option<String>,

    /// Whether segments went through the translator
    pub translated: bool,

    /// Emitted segments
    pub segments: Vec<CaptionSegment>,

    /// Where the subtitle file was written
    pub output_path: PathBuf,
}

/// Download, transcribe, translate and serialize captions for one video
pub struct CaptionPipeline {
    fetcher: Arc<dyn ExtractionBackend>,
    media: Arc<dyn MediaBackend>,
    recognizer: Arc<dyn SpeechRecognizer>,
    translator: Arc<dyn Translator>,
    target_language: String,
    temp_parent: Option<PathBuf>,
    show_progress: bool,
}

impl CaptionPipeline {
    pub fn new(
        fetcher: Arc<dyn ExtractionBackend>,
        media: Arc<dyn MediaBackend>,
        recognizer: Arc<dyn SpeechRecognizer>,
        translator: Arc<dyn Translator>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            media,
            recognizer,
            translator,
            target_language: target_language.into(),
            temp_parent: None,
            show_progress: false,
        }
    }

    /// Create per-run temporary directories under `dir`
    pub fn with_temp_parent(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_parent = dir;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Generate captions for `url` and write them to `output`
    ///
    /// Every intermediate file lives in a temporary directory that is removed when
    /// this returns, whether it succeeds or not.
    pub async fn generate(
        &self,
        url: &str,
        language: Option<&str>,
        output: &Path,
        format: &CaptionFormat,
    ) -> Result<CaptionOutcome> {
        let workdir = utils::scoped_temp_dir(self.temp_parent.as_deref())
            .map_err(|e| VidscribeError::pipeline(PipelineStage::Download, &e))?;
        let video_path = workdir.path().join("source.mp4");
        let audio_path = workdir.path().join("audio.wav");
        let subtitle_path = workdir.path().join(format!("captions.{}", format.extension()));

        let progress = utils::spinner(self.show_progress);

        tracing::info!("Downloading media for captions: {}", url);
        progress.set_message("Downloading video...");
        self.fetcher
            .download(url, &video_path)
            .await
            .map_err(|e| VidscribeError::pipeline(PipelineStage::Download, &e))?;

        tracing::info!("Extracting audio track");
        progress.set_message("Extracting audio...");
        self.media
            .extract_audio(&video_path, &audio_path)
            .await
            .map_err(|e| VidscribeError::pipeline(PipelineStage::AudioExtraction, &e))?;

        tracing::info!("Transcribing audio");
        progress.set_message("Transcribing with Whisper... This may take a while.");
        let transcription = self
            .recognizer
            .transcribe(&audio_path, language)
            .await
            .map_err(|e| VidscribeError::pipeline(PipelineStage::Transcription, &e))?;

        let detected = transcription.language.clone();
        let translated = needs_translation(detected.as_deref(), &self.target_language);
        tracing::info!(
            "Recognized {} segments (language: {})",
            transcription.segments.len(),
            detected.as_deref().unwrap_or("unknown")
        );

        if translated {
            progress.set_message(format!(
                "Translating {} segments to {}...",
                transcription.segments.len(),
                self.target_language
            ));
        }
        let segments = translate_segments(self.translator.as_ref(), transcription, &self.target_language)
            .await
            .map_err(|e| VidscribeError::pipeline(PipelineStage::Translation, &e))?;
        let segments = normalize_segments(segments);

        progress.set_message("Writing captions...");
        crate::output::save_to_file(&segments, &subtitle_path, format)
            .and_then(|_| utils::copy_out(&subtitle_path, output))
            .map_err(|e| VidscribeError::pipeline(PipelineStage::Output, &e))?;

        progress.finish_with_message("Captions ready");

        Ok(CaptionOutcome {
            language: detected,
            translated,
            segments,
            output_path: output.to_path_buf(),
        })
    }
}
