use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vidscribe",
    about = "vidscribe - Resolve video links, generate English captions and convert videos",
    version,
    long_about = "A CLI tool that resolves a video number or page URL to a playable stream with yt-dlp, keeps a record of every lookup, generates auto-translated English captions with Whisper, and converts videos to other formats with ffmpeg."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, env = "VIDSCRIBE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a video number or URL and show its stream
    Resolve {
        /// Full link or video number (e.g. 1123503)
        #[arg(value_name = "URL_OR_NUMBER")]
        input: String,
    },

    /// Generate auto-translated English captions
    Captions {
        /// Full link or video number (e.g. 1123503)
        #[arg(value_name = "URL_OR_NUMBER")]
        input: String,

        /// Output file path (defaults to <id>.en.<format> in the current directory)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Subtitle format
        #[arg(short, long, value_enum, default_value = "vtt")]
        format: CaptionFormat,

        /// Whisper model (overrides the configured one)
        #[arg(short, long, value_name = "MODEL")]
        model: Option<String>,

        /// Spoken language code (auto-detect if not specified)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,
    },

    /// Download a video and convert it to another container
    Transcode {
        /// Full link or video number (e.g. 1123503)
        #[arg(value_name = "URL_OR_NUMBER")]
        input: String,

        /// Output file path (defaults to <id>.<container> in the current directory)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Container extension (overrides the configured one, e.g. avi, mkv)
        #[arg(short, long, value_name = "EXT")]
        container: Option<String>,
    },

    /// List stored videos
    Videos,

    /// List every submitted input
    Backups,

    /// Show or locate the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Check that yt-dlp, ffmpeg and whisper are installed
    Check,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum CaptionFormat {
    /// WebVTT subtitles
    Vtt,
    /// SubRip subtitles
    Srt,
    /// JSON segments with timestamps
    Json,
}

impl CaptionFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CaptionFormat::Vtt => "vtt",
            CaptionFormat::Srt => "srt",
            CaptionFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for CaptionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}
