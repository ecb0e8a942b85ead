use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::Translator;
use crate::Result;

/// Translator backed by the public Google translate web endpoint
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn request_url(&self, text: &str, target_language: &str) -> String {
        format!(
            "{}?client=gtx&sl=auto&tl={}&dt=t&q={}",
            self.endpoint,
            urlencoding::encode(target_language),
            urlencoding::encode(text)
        )
    }
}

/// Join the translated sentence chunks of a response body
///
/// The body looks like `[[["Hello", "bonjour", null, null, 10], ...], null, "fr", ...]`.
pub fn parse_translation(body: &Value) -> Option<String> {
    let chunks = body.get(0)?.as_array()?;
    let translated: String = chunks
        .iter()
        .filter_map(|chunk| chunk.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        None
    } else {
        Some(translated)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let response = self
            .client
            .get(self.request_url(text, target_language))
            .send()
            .await
            .context("Translation request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Translation request failed: HTTP {}", response.status());
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to read translation response")?;

        parse_translation(&body)
            .ok_or_else(|| anyhow::anyhow!("Translation response contained no text"))
    }
}
