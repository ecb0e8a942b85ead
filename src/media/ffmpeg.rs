use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use super::{EncodeTarget, MediaBackend};
use crate::Result;

/// Media backend driven by the ffmpeg executable
pub struct FfmpegBackend {
    ffmpeg_path: String,
}

impl FfmpegBackend {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    pub fn audio_args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-i".into(), input.to_string_lossy().into_owned(),
            "-vn".into(), // No video
            "-acodec".into(), "pcm_s16le".into(),
            "-ar".into(), "16000".into(), // Whisper resamples to 16 kHz anyway
            "-ac".into(), "1".into(),
            "-y".into(),
            output.to_string_lossy().into_owned(),
        ]
    }

    pub fn transcode_args(input: &Path, output: &Path, target: &EncodeTarget) -> Vec<String> {
        vec![
            "-i".into(), input.to_string_lossy().into_owned(),
            "-c:v".into(), target.video_codec.clone(),
            "-c:a".into(), target.audio_codec.clone(),
            "-y".into(),
            output.to_string_lossy().into_owned(),
        ]
    }

    async fn run(&self, args: &[String]) -> Result<()> {
        tracing::debug!("Running {} {}", self.ffmpeg_path, args.join(" "));

        let output = Command::new(&self.ffmpeg_path)
            .arg("-hide_banner")
            .args(args)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run {}: {}", self.ffmpeg_path, e))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            // ffmpeg prints its banner and stream map first; the cause is at the end
            let tail: Vec<&str> = error.lines().rev().take(5).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            anyhow::bail!("ffmpeg failed: {}", tail.join("\n"));
        }

        Ok(())
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<()> {
        tracing::debug!("Extracting audio from {}", input.display());
        self.run(&Self::audio_args(input, output)).await
    }

    async fn transcode(&self, input: &Path, output: &Path, target: &EncodeTarget) -> Result<()> {
        tracing::debug!(
            "Transcoding {} to .{} ({} / {})",
            input.display(),
            target.container,
            target.video_codec,
            target.audio_codec
        );
        self.run(&Self::transcode_args(input, output, target)).await
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_audio_args_request_mono_pcm() {
        let args = FfmpegBackend::audio_args(&PathBuf::from("in.mp4"), &PathBuf::from("out.wav"));
        assert_eq!(args.first().map(String::as_str), Some("-i"));
        assert!(args.windows(2).any(|w| w[0] == "-acodec" && w[1] == "pcm_s16le"));
        assert!(args.windows(2).any(|w| w[0] == "-ac" && w[1] == "1"));
        assert!(args.contains(&"-vn".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("out.wav"));
    }

    #[test]
    fn test_transcode_args_use_target_codecs() {
        let target = EncodeTarget::default().with_container(".mkv");
        assert_eq!(target.container, "mkv");

        let args = FfmpegBackend::transcode_args(
            &PathBuf::from("in.mp4"),
            &PathBuf::from("video.mkv"),
            &target,
        );
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "libxvid"));
        assert!(args.windows(2).any(|w| w[0] == "-c:a" && w[1] == "libmp3lame"));
    }

    #[tokio::test]
    async fn test_missing_executable_is_reported() {
        let backend = FfmpegBackend::new("vidscribe-no-such-ffmpeg");
        let err = backend
            .extract_audio(&PathBuf::from("in.mp4"), &PathBuf::from("out.wav"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("vidscribe-no-such-ffmpeg"));
    }
}
