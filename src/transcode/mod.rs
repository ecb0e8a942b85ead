use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::media::{EncodeTarget, MediaBackend};
use crate::resolver::ExtractionBackend;
use crate::utils;
use crate::{PipelineStage, Result, VidscribeError};

/// Result of a transcode run
#[derive(Debug, Clone)]
pub struct TranscodeOutcome {
    /// Where the re-encoded file was written
    pub output_path: PathBuf,

    /// Size of the re-encoded file in bytes
    pub size: u64,

    /// Container and codecs used
    pub target: EncodeTarget,
}

/// Download a video and re-encode it into another container
pub struct TranscodePipeline {
    fetcher: Arc<dyn ExtractionBackend>,
    media: Arc<dyn MediaBackend>,
    temp_parent: Option<PathBuf>,
    show_progress: bool,
}

impl TranscodePipeline {
    pub fn new(fetcher: Arc<dyn ExtractionBackend>, media: Arc<dyn MediaBackend>) -> Self {
        Self {
            fetcher,
            media,
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

    pub async fn run(&self, url: &str, target: &EncodeTarget, output: &Path) -> Result<TranscodeOutcome> {
        let workdir = utils::scoped_temp_dir(self.temp_parent.as_deref())
            .map_err(|e| VidscribeError::pipeline(PipelineStage::Download, &e))?;
        let video_path = workdir.path().join("source.mp4");
        let encoded_path = workdir.path().join(format!("video.{}", target.container));

        let progress = utils::spinner(self.show_progress);

        tracing::info!("Downloading media for transcode: {}", url);
        progress.set_message("Downloading video...");
        self.fetcher
            .download(url, &video_path)
            .await
            .map_err(|e| VidscribeError::pipeline(PipelineStage::Download, &e))?;

        tracing::info!(
            "Re-encoding to .{} ({} / {})",
            target.container,
            target.video_codec,
            target.audio_codec
        );
        progress.set_message(format!("Converting to .{}...", target.container));
        self.media
            .transcode(&video_path, &encoded_path, target)
            .await
            .map_err(|e| VidscribeError::pipeline(PipelineStage::Encoding, &e))?;

        let size = utils::copy_out(&encoded_path, output)
            .map_err(|e| VidscribeError::pipeline(PipelineStage::Output, &e))?;

        progress.finish_with_message("Conversion complete");

        Ok(TranscodeOutcome {
            output_path: output.to_path_buf(),
            size,
            target: target.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MockMediaBackend;
    use crate::resolver::MockExtractionBackend;

    fn fetcher(succeeds: bool) -> MockExtractionBackend {
        let mut fetcher = MockExtractionBackend::new();
        fetcher.expect_download().times(1).returning(move |_, path| {
            if !succeeds {
                anyhow::bail!("HTTP Error 404: Not Found");
            }
            fs_err::write(path, b"mp4 bytes")?;
            Ok(())
        });
        fetcher
    }

    #[tokio::test]
    async fn test_transcode_copies_result_out() {
        let scratch = tempfile::tempdir().unwrap();
        let temp_parent = scratch.path().join("tmp");
        let output = scratch.path().join("1123503.avi");

        let mut media = MockMediaBackend::new();
        media
            .expect_transcode()
            .withf(|input, out, target| {
                input.ends_with("source.mp4")
                    && out.extension().and_then(|e| e.to_str()) == Some("avi")
                    && target.video_codec == "libxvid"
            })
            .times(1)
            .returning(|_, out, _| {
                fs_err::write(out, b"avi bytes")?;
                Ok(())
            });

        let pipeline = TranscodePipeline::new(Arc::new(fetcher(true)), Arc::new(media))
            .with_temp_parent(Some(temp_parent.clone()));
        let outcome = pipeline
            .run("https://hsex.icu/video-1123503.htm", &EncodeTarget::default(), &output)
            .await
            .unwrap();

        assert_eq!(outcome.size, 9);
        assert_eq!(fs_err::read(&output).unwrap(), b"avi bytes");
        assert_eq!(fs_err::read_dir(&temp_parent).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_download_failure_skips_encoding() {
        let scratch = tempfile::tempdir().unwrap();
        let temp_parent = scratch.path().join("tmp");
        let output = scratch.path().join("video.avi");

        let mut media = MockMediaBackend::new();
        media.expect_transcode().times(0);

        let pipeline = TranscodePipeline::new(Arc::new(fetcher(false)), Arc::new(media))
            .with_temp_parent(Some(temp_parent.clone()));
        let err = pipeline
            .run("https://example.com/gone", &EncodeTarget::default(), &output)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<VidscribeError>(),
            Some(VidscribeError::Pipeline { stage: PipelineStage::Download, .. })
        ));
        assert!(!output.exists());
        assert_eq!(fs_err::read_dir(&temp_parent).unwrap().count(), 0);
    }
}
