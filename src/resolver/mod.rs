use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use url::Url;

pub mod ytdlp;

pub use ytdlp::YtDlpBackend;

use crate::{Result, VidscribeError};

/// Identifier stored when a URL carries no recognisable video number
pub const UNKNOWN_IDENTIFIER: &str = "unknown";

/// Author shown when no metadata field names one
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// A video link resolved to a playable stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedVideo {
    /// Video number recovered from the input, or `unknown`
    pub identifier: String,

    /// URL handed to the extraction backend
    pub canonical_url: String,

    /// Directly playable media URL
    pub stream_url: String,

    /// Title of the video
    pub title: String,

    /// Uploader or channel name
    pub author: String,
}

/// Contract of the external extraction backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Fetch the metadata document for a page URL without downloading media
    async fn extract_info(&self, url: &str) -> Result<Value>;

    /// Download the media behind a page URL to `output_path`
    async fn download(&self, url: &str, output_path: &Path) -> Result<()>;

    /// Get the name of this backend
    fn backend_name(&self) -> &'static str;
}

/// One step in the author lookup, evaluated in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorRule {
    /// Use this metadata field when it holds a non-empty string
    Field(&'static str),
    /// Use this literal
    Fallback(&'static str),
}

pub const AUTHOR_RULES: &[AuthorRule] = &[
    AuthorRule::Field("uploader"),
    AuthorRule::Field("channel"),
    AuthorRule::Field("uploader_id"),
    AuthorRule::Fallback(UNKNOWN_AUTHOR),
];

/// Apply `rules` in sequence and return the first author they produce
pub fn resolve_author(info: &Value, rules: &[AuthorRule]) -> String {
    for rule in rules {
        match rule {
            AuthorRule::Field(field) => {
                if let Some(value) = info[*field].as_str().map(str::trim) {
                    if !value.is_empty() {
                        return value.to_string();
                    }
                }
            }
            AuthorRule::Fallback(literal) => return literal.to_string(),
        }
    }
    UNKNOWN_AUTHOR.to_string()
}

/// True when the input is a bare video number
pub fn is_numeric_id(input: &str) -> bool {
    !input.is_empty() && input.chars().all(|c| c.is_ascii_digit())
}

/// Build the URL handed to the extraction backend
pub fn canonical_url(input: &str, template: &str) -> String {
    if is_numeric_id(input) {
        template.replace("{id}", input)
    } else {
        input.to_string()
    }
}

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"video-(\d+)").expect("valid regex"))
}

fn digit_run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

/// Recover the video number from a page URL
pub fn recover_identifier(url: &str) -> String {
    if let Some(caps) = video_id_pattern().captures(url) {
        return caps[1].to_string();
    }

    let path = Url::parse(url)
        .map(|parsed| parsed.path().to_string())
        .unwrap_or_else(|_| url.to_string());

    digit_run_pattern()
        .find_iter(&path)
        .last()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTIFIER.to_string())
}

fn has_codec(format: &Value, key: &str) -> bool {
    format[key].as_str().map_or(false, |codec| !codec.is_empty() && codec != "none")
}

/// Pick the playable URL out of an extraction document
///
/// Without a top-level `url`, the last format carrying both video and audio wins,
/// then the last video-only format, `requested_formats` before `formats`.
/// Audio-only formats are never returned.
fn stream_url(info: &Value) -> Option<String> {
    if let Some(url) = info["url"].as_str() {
        return Some(url.to_string());
    }

    let pick = |wanted: fn(&Value) -> bool| {
        ["requested_formats", "formats"].iter().find_map(|key| {
            info[*key]
                .as_array()?
                .iter()
                .rev()
                .filter(|format| wanted(format))
                .find_map(|format| format["url"].as_str())
        })
    };

    pick(|f| has_codec(f, "vcodec") && has_codec(f, "acodec"))
        .or_else(|| pick(|f| has_codec(f, "vcodec")))
        .map(str::to_string)
}

/// Turns user input into a [`ResolvedVideo`]
pub struct Resolver {
    backend: Arc<dyn ExtractionBackend>,
    url_template: String,
    author_rules: &'static [AuthorRule],
}

impl Resolver {
    pub fn new(backend: Arc<dyn ExtractionBackend>, url_template: impl Into<String>) -> Self {
        Self {
            backend,
            url_template: url_template.into(),
            author_rules: AUTHOR_RULES,
        }
    }

    /// Canonical URL and identifier for raw input, without contacting the backend
    pub fn locate(&self, input: &str) -> (String, String) {
        let input = input.trim();
        if is_numeric_id(input) {
            (canonical_url(input, &self.url_template), input.to_string())
        } else {
            (input.to_string(), recover_identifier(input))
        }
    }

    /// Resolve raw input to a playable stream and its metadata
    pub async fn resolve(&self, input: &str) -> Result<ResolvedVideo> {
        let (canonical_url, identifier) = self.locate(input);
        if canonical_url.is_empty() {
            return Err(VidscribeError::Resolution("empty input".to_string()).into());
        }

        tracing::info!(
            "Resolving {} via {} (id: {})",
            canonical_url,
            self.backend.backend_name(),
            identifier
        );

        let info = self
            .backend
            .extract_info(&canonical_url)
            .await
            .map_err(|e| VidscribeError::Resolution(format!("{:#}", e)))?;

        let stream_url = stream_url(&info).ok_or_else(|| {
            VidscribeError::Resolution(format!("no playable stream found for {}", canonical_url))
        })?;

        let title = info["title"]
            .as_str()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("Untitled")
            .to_string();

        let author = resolve_author(&info, self.author_rules);

        Ok(ResolvedVideo {
            identifier,
            canonical_url,
            stream_url,
            title,
            author,
        })
    }
}
