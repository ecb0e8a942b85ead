use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::VidscribeError;

/// Template used when the user enters a bare video number
pub const DEFAULT_URL_TEMPLATE: &str = "https://hsex.icu/video-{id}.htm";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where resolved videos and the input backup live
    pub storage: StorageConfig,

    /// Link resolution settings
    pub resolver: ResolverConfig,

    /// Caption generation settings
    pub captions: CaptionsConfig,

    /// Re-encoding settings
    pub transcode: TranscodeConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database holding one row per resolved video
    pub database_path: PathBuf,

    /// JSON array of every raw input ever submitted
    pub backup_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Canonical URL template, `{id}` is replaced by the video number
    pub url_template: String,

    /// yt-dlp executable
    pub yt_dlp_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionsConfig {
    /// Whisper CLI executable
    pub whisper_path: String,

    /// Whisper model name
    pub model: String,

    /// Language captions are translated into
    pub target_language: String,

    /// Translation web endpoint
    pub translate_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// ffmpeg executable
    pub ffmpeg_path: String,

    /// Output container extension
    pub container: String,

    /// ffmpeg video encoder
    pub video_codec: String,

    /// ffmpeg audio encoder
    pub audio_codec: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Parent directory for per-run temporary directories
    pub temp_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidscribe");

        Self {
            storage: StorageConfig {
                database_path: data_dir.join("videos.db"),
                backup_path: data_dir.join("backup.json"),
            },
            resolver: ResolverConfig {
                url_template: DEFAULT_URL_TEMPLATE.to_string(),
                yt_dlp_path: "yt-dlp".to_string(),
            },
            captions: CaptionsConfig {
                whisper_path: "whisper".to_string(),
                model: "base".to_string(),
                target_language: "en".to_string(),
                translate_endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
            },
            transcode: TranscodeConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                container: "avi".to_string(),
                video_codec: "libxvid".to_string(),
                audio_codec: "libmp3lame".to_string(),
            },
            app: AppConfig { temp_dir: None },
        }
    }
}

fn config_error(err: anyhow::Error) -> anyhow::Error {
    VidscribeError::Config(format!("{:#}", err)).into()
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = Self::config_path(explicit)?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")
                .map_err(config_error)?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")
                .map_err(config_error)?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(&config_path).await?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        let local_config = PathBuf::from("vidscribe.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("vidscribe").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.resolver.url_template.contains("{id}") {
            return Err(VidscribeError::Config(format!(
                "resolver.url_template must contain {{id}}: {}",
                self.resolver.url_template
            ))
            .into());
        }

        let tools = [
            ("resolver.yt_dlp_path", &self.resolver.yt_dlp_path),
            ("captions.whisper_path", &self.captions.whisper_path),
            ("transcode.ffmpeg_path", &self.transcode.ffmpeg_path),
        ];
        for (key, value) in tools {
            if value.trim().is_empty() {
                return Err(VidscribeError::Config(format!("{} must not be empty", key)).into());
            }
        }

        if self.transcode.container.trim().is_empty() {
            return Err(VidscribeError::Config("transcode.container must not be empty".into()).into());
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Database: {}", self.storage.database_path.display());
        println!("  Input Backup: {}", self.storage.backup_path.display());
        println!("  URL Template: {}", self.resolver.url_template);
        println!("  yt-dlp: {}", self.resolver.yt_dlp_path);
        println!("  Whisper: {} (model: {})", self.captions.whisper_path, self.captions.model);
        println!("  Caption Language: {}", self.captions.target_language);
        println!(
            "  Transcode: {} -> .{} ({} / {})",
            self.transcode.ffmpeg_path,
            self.transcode.container,
            self.transcode.video_codec,
            self.transcode.audio_codec
        );
        if let Some(dir) = &self.app.temp_dir {
            println!("  Temp Dir: {}", dir.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolver.url_template, DEFAULT_URL_TEMPLATE);
        assert_eq!(config.captions.model, "base");
        assert_eq!(config.transcode.container, "avi");
    }

    #[test]
    fn test_template_without_placeholder_is_rejected() {
        let mut config = Config::default();
        config.resolver.url_template = "https://example.com/video.htm".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("{id}"));
    }

    #[test]
    fn test_empty_tool_path_is_rejected() {
        let mut config = Config::default();
        config.transcode.ffmpeg_path = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_writes_default_then_reads_it_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let first = Config::load(Some(&path)).await.unwrap();
        assert!(path.exists());

        let second = Config::load(Some(&path)).await.unwrap();
        assert_eq!(first.resolver.url_template, second.resolver.url_template);
        assert_eq!(first.storage.database_path, second.storage.database_path);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.resolver.url_template = "https://example.com/".to_string();
        config.save_to(&path).await.unwrap();

        assert!(Config::load(Some(&path)).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(&path, "storage: [not, a, map]\n").unwrap();

        let err = Config::load(Some(&path)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VidscribeError>(),
            Some(VidscribeError::Config(_))
        ));

        let report = crate::app::describe_failure(&err);
        assert_eq!(report.headline, "Invalid configuration");
        assert!(report.detail.contains("Failed to parse config file"));
    }
}
