use anyhow::Result;
use std::path::Path;

use crate::captions::CaptionSegment;
use crate::cli::CaptionFormat;

pub mod formatters;

pub use formatters::*;

/// Render segments in the requested subtitle format
pub fn render(segments: &[CaptionSegment], format: &CaptionFormat) -> Result<String> {
    let content = match format {
        CaptionFormat::Vtt => format_as_vtt(segments),
        CaptionFormat::Srt => format_as_srt(segments),
        CaptionFormat::Json => format_as_json(segments)?,
    };
    Ok(content)
}

/// Save rendered subtitles to file
pub fn save_to_file(segments: &[CaptionSegment], path: &Path, format: &CaptionFormat) -> Result<()> {
    let content = render(segments, format)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs_err::create_dir_all(parent)?;
        }
    }
    fs_err::write(path, content)?;
    Ok(())
}
