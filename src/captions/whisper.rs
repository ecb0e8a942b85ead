use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::{CaptionSegment, SpeechRecognizer, Transcription};
use crate::Result;

/// JSON document written by `whisper --output_format json`
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Speech recognizer driven by the openai-whisper command line
pub struct WhisperCli {
    whisper_path: String,
    model: String,
}

impl WhisperCli {
    pub fn new(whisper_path: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            whisper_path: whisper_path.into(),
            model: model.into(),
        }
    }

    /// Parse a whisper JSON document
    pub fn parse_output(json: &str) -> Result<Transcription> {
        let output: WhisperOutput = serde_json::from_str(json)
            .context("Failed to parse whisper output")?;

        Ok(Transcription {
            language: output.language,
            segments: output
                .segments
                .into_iter()
                .map(|s| CaptionSegment {
                    start_seconds: s.start,
                    end_seconds: s.end,
                    text: s.text,
                })
                .collect(),
        })
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperCli {
    async fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcription> {
        let output_dir = audio_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Audio path has no parent: {}", audio_path.display()))?;

        let mut command = Command::new(&self.whisper_path);
        command
            .arg(audio_path)
            .args(["--model", &self.model])
            .args(["--task", "transcribe"])
            .args(["--output_format", "json"])
            .arg("--output_dir")
            .arg(output_dir)
            .args(["--verbose", "False"]);

        if let Some(lang) = language {
            tracing::info!("Using specified language: {}", lang);
            command.args(["--language", lang]);
        } else {
            tracing::info!("Using automatic language detection");
        }

        tracing::debug!("Running whisper with model {}", self.model);
        let output = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run {}: {}", self.whisper_path, e))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("whisper failed: {}", error.trim());
        }

        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let json_path = output_dir.join(format!("{}.json", stem));
        let json = fs_err::read_to_string(&json_path)
            .context("whisper finished but wrote no transcript")?;

        Self::parse_output(&json)
    }
}
