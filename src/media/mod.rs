use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod ffmpeg;

pub use ffmpeg::FfmpegBackend;

use crate::config::TranscodeConfig;
use crate::Result;

/// Container and codec pair for a re-encode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeTarget {
    /// File extension of the output container (avi, mkv, webm, ...)
    pub container: String,

    /// Encoder for the video stream
    pub video_codec: String,

    /// Encoder for the audio stream
    pub audio_codec: String,
}

impl EncodeTarget {
    pub fn from_config(config: &TranscodeConfig) -> Self {
        Self {
            container: config.container.clone(),
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
        }
    }

    /// Same codecs, different container
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into().trim_start_matches('.').to_string();
        self
    }
}

impl Default for EncodeTarget {
    fn default() -> Self {
        Self {
            container: "avi".to_string(),
            video_codec: "libxvid".to_string(),
            audio_codec: "libmp3lame".to_string(),
        }
    }
}

/// Contract of the external media decode/encode backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Write the first audio track of `input` to `output` as 16 kHz mono WAV
    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<()>;

    /// Re-encode `input` into `output` with the given codecs
    async fn transcode(&self, input: &Path, output: &Path, target: &EncodeTarget) -> Result<()>;
}
