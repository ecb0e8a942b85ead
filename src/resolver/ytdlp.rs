use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::ExtractionBackend;
use crate::Result;

/// Extraction backend driven by the yt-dlp executable
pub struct YtDlpBackend {
    yt_dlp_path: String,
}

impl YtDlpBackend {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }
}

#[async_trait]
impl ExtractionBackend for YtDlpBackend {
    async fn extract_info(&self, url: &str) -> Result<Value> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--dump-json",
                "--no-playlist",
                "--quiet",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run {}: {}", self.yt_dlp_path, e))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let json_str = String::from_utf8(output.stdout)?;
        let info: Value = serde_json::from_str(&json_str)?;

        Ok(info)
    }

    async fn download(&self, url: &str, output_path: &Path) -> Result<()> {
        tracing::debug!("Downloading {} to {}", url, output_path.display());

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--output", &output_path.to_string_lossy(),
                // Single progressive file so the path above is the final file
                "--format", "best[ext=mp4]/best",
                "--no-playlist",
                "--no-part",
                "--quiet",
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run {}: {}", self.yt_dlp_path, e))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to download video: {}", error.trim());
        }

        if !output_path.exists() {
            anyhow::bail!("yt-dlp finished but produced no file at {}", output_path.display());
        }

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "yt-dlp"
    }
}

impl Default for YtDlpBackend {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_executable_is_reported() {
        let backend = YtDlpBackend::new("vidscribe-no-such-yt-dlp");
        let err = backend.extract_info("https://example.com").await.unwrap_err();
        assert!(err.to_string().contains("vidscribe-no-such-yt-dlp"));
    }
}
