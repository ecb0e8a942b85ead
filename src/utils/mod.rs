use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

use crate::resolver::UNKNOWN_IDENTIFIER;

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            match c {
                // Keep alphanumeric characters, spaces, hyphens, underscores, and dots
                c if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' => c,
                // Replace everything else with underscore
                _ => '_',
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Generate a unique filename with timestamp
pub fn generate_unique_filename(base_name: &str, extension: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let random_suffix = uuid::Uuid::new_v4().to_string()[..8].to_string();

    format!("{}_{}_{}.{}",
        sanitize_filename(base_name),
        timestamp,
        random_suffix,
        extension
    )
}

/// Default file name for an artifact of `identifier`
pub fn default_output_name(identifier: &str, extension: &str) -> PathBuf {
    let name = if identifier == UNKNOWN_IDENTIFIER {
        generate_unique_filename("video", extension)
    } else {
        format!("{}.{}", sanitize_filename(identifier), extension)
    };
    PathBuf::from(name)
}

/// Extract domain from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| {
            // Remove 'www.' prefix if present
            if let Some(stripped) = host.strip_prefix("www.") {
                stripped.to_string()
            } else {
                host.to_string()
            }
        })
}

/// Temporary directory removed when the returned guard drops
pub fn scoped_temp_dir(parent: Option<&Path>) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("vidscribe-");

    let dir = match parent {
        Some(parent) => {
            fs_err::create_dir_all(parent)?;
            builder.tempdir_in(parent)
        }
        None => builder.tempdir(),
    };
    dir.context("Failed to create temporary directory")
}

/// Copy a finished artifact out of a temporary directory
pub fn copy_out(from: &Path, to: &Path) -> Result<u64> {
    if let Some(parent) = to.parent() {
        if !parent.as_os_str().is_empty() {
            fs_err::create_dir_all(parent)?;
        }
    }
    let bytes = fs_err::copy(from, to)?;
    Ok(bytes)
}

/// Spinner that clears itself when dropped before it was finished
pub struct Spinner(ProgressBar);

impl Deref for Spinner {
    type Target = ProgressBar;

    fn deref(&self) -> &ProgressBar {
        &self.0
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.0.is_finished() {
            self.0.finish_and_clear();
        }
    }
}

/// Spinner for a long step; hidden when progress output is off
pub fn spinner(enabled: bool) -> Spinner {
    if !enabled {
        return Spinner(ProgressBar::hidden());
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress.enable_steady_tick(Duration::from_millis(120));
    Spinner(progress)
}

/// Check if the current environment has required tools
pub async fn check_dependencies(tools: &[(&str, &str)]) -> Vec<String> {
    let mut missing = Vec::new();

    for (command, purpose) in tools {
        if !check_command_available(command).await {
            missing.push(format!("{} - {}", command, purpose));
        }
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    let probe = if command.contains("whisper") { "--help" } else { "--version" };

    Command::new(command)
        .arg(probe)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
