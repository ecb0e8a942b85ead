//! vidscribe - A Rust CLI tool for resolving video links, captioning and transcoding them
//!
//! This library resolves a numeric video id or a page URL to a playable stream through
//! yt-dlp, keeps a small SQLite record of resolved videos plus a JSON log of every input,
//! generates English WebVTT captions with Whisper and an HTTP translator, and re-encodes
//! media with ffmpeg.

pub mod app;
pub mod captions;
pub mod cli;
pub mod config;
pub mod media;
pub mod output;
pub mod resolver;
pub mod storage;
pub mod transcode;
pub mod utils;

pub use app::App;
pub use captions::{CaptionPipeline, CaptionSegment, Transcription};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use resolver::{ResolvedVideo, Resolver};
pub use storage::{InputBackupEntry, Persistence, VideoRecord};
pub use transcode::TranscodePipeline;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Stage of a caption or transcode run that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Download,
    AudioExtraction,
    Transcription,
    Translation,
    Encoding,
    Output,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Download => write!(f, "download"),
            PipelineStage::AudioExtraction => write!(f, "audio extraction"),
            PipelineStage::Transcription => write!(f, "transcription"),
            PipelineStage::Translation => write!(f, "translation"),
            PipelineStage::Encoding => write!(f, "encoding"),
            PipelineStage::Output => write!(f, "output"),
        }
    }
}

/// Error types specific to vidscribe
#[derive(thiserror::Error, Debug)]
pub enum VidscribeError {
    #[error("Could not resolve video: {0}")]
    Resolution(String),

    #[error("Pipeline failed during {stage}: {detail}")]
    Pipeline { stage: PipelineStage, detail: String },

    #[error("Storage operation failed: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VidscribeError {
    /// Wrap an error chain as a pipeline failure at `stage`
    pub fn pipeline(stage: PipelineStage, err: &anyhow::Error) -> Self {
        VidscribeError::Pipeline {
            stage,
            detail: format!("{:#}", err),
        }
    }
}
