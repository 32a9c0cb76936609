//! Generation service boundary
//!
//! Thin clients for the external generative-AI service: a text model that
//! produces the location list as structured JSON, and an image model that
//! returns inline base64 PNG data. Both speak the `generateContent` REST API
//! over reqwest. The round lifecycle controller consumes them through the
//! [`LocationSource`] and [`ImageSource`] traits so tests can substitute
//! mocks.

pub mod image_gen;
pub mod locations;
pub mod retry;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quiz::types::Location;

pub use image_gen::ImageClient;
pub use locations::LocationClient;

/// Errors from the generation service boundary
#[derive(Debug, Error)]
pub enum GenError {
    #[error("network error: {0}")]
    Network(String),
    /// The Display form carries the numeric status, which is how the retry
    /// wrapper classifies 429 responses as rate limited.
    #[error("API error: status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("empty response from generator")]
    EmptyResponse,
    #[error("io error: {0}")]
    Io(String),
}

/// Source of the per-game location list
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Generate at least `count` well-formed locations, avoiding the names
    /// in `exclude_names`. A short or malformed list is a failure, never a
    /// silently truncated game.
    async fn generate_locations(
        &self,
        count: usize,
        exclude_names: &[String],
    ) -> Result<Vec<Location>, GenError>;
}

/// Source of the per-round photos
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Generate a photo for `location`, write it to disk, and return its
    /// path. A response without image data is [`GenError::EmptyResponse`].
    async fn generate_image(&self, location: &Location) -> Result<PathBuf, GenError>;
}

/// Configuration for the generation service
#[derive(Clone, Debug)]
pub struct GenConfig {
    /// Base URL of the API server
    pub base_url: String,
    /// API key appended to every request
    pub api_key: String,
    /// Text model used for the location list
    pub text_model: String,
    /// Image model used for the round photos
    pub image_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Directory the decoded PNGs are written under
    pub output_dir: PathBuf,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: String::new(),
            text_model: "gemini-3-flash-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            timeout_secs: 120,
            output_dir: PathBuf::from("shots"),
        }
    }
}

impl GenConfig {
    pub(crate) fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// === generateContent wire format ===

#[derive(Serialize, Debug)]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<WireContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub(crate) struct WireContent {
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub(crate) struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        default,
        rename = "inlineData",
        skip_serializing_if = "Option::is_none"
    )]
    pub inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct InlineData {
    #[serde(default, rename = "mimeType")]
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
pub(crate) struct Candidate {
    #[serde(default)]
    pub content: WireContent,
}

impl GenerateContentRequest {
    pub(crate) fn from_prompt(prompt: String, generation_config: Option<serde_json::Value>) -> Self {
        Self {
            contents: vec![WireContent {
                parts: vec![WirePart {
                    text: Some(prompt),
                    inline_data: None,
                }],
            }],
            generation_config,
        }
    }
}

/// POST a generateContent request and deserialize the response, mapping HTTP
/// failures into the error taxonomy.
pub(crate) async fn post_generate(
    client: &reqwest::Client,
    url: &str,
    request: &GenerateContentRequest,
) -> Result<GenerateContentResponse, GenError> {
    let response = client
        .post(url)
        .json(request)
        .send()
        .await
        .map_err(|e| GenError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenError::Api {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| GenError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_status_is_visible_in_the_error_string() {
        let err = GenError::Api {
            status: 429,
            body: "quota exceeded".to_string(),
        };
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn endpoint_includes_model_and_key() {
        let config = GenConfig {
            api_key: "k123".to_string(),
            ..GenConfig::default()
        };
        let url = config.endpoint(&config.text_model);
        assert!(url.contains("/v1beta/models/gemini-3-flash-preview:generateContent"));
        assert!(url.ends_with("key=k123"));
    }
}
