//! Per-round photo generation via the image model
//!
//! Builds a photographic prompt from a location's name and atmosphere
//! description, requests a 16:9 frame with no rendered text or signage, and
//! decodes the inline base64 PNG from the reply. Decoded images are written
//! under a timestamped session directory and referenced by path from the
//! round state.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine;
use chrono::Local;
use serde_json::json;
use tracing::debug;

use crate::quiz::types::Location;

use super::{post_generate, GenConfig, GenError, GenerateContentRequest, ImageSource};

/// Client for the photo-generation capability
pub struct ImageClient {
    config: GenConfig,
    client: reqwest::Client,
    session_dir: PathBuf,
}

impl ImageClient {
    pub fn new(config: GenConfig) -> Result<Self, GenError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GenError::Network(e.to_string()))?;
        let session_dir = config
            .output_dir
            .join(Local::now().format("session_%Y%m%d_%H%M%S").to_string());
        Ok(Self {
            config,
            client,
            session_dir,
        })
    }

    fn prompt(location: &Location) -> String {
        format!(
            "A realistic photographic view of a street or landscape in {}. {}. \
             Cinematic, 8k. NO TEXT, NO SIGNS, NO UI. Focus on architecture and nature.",
            location.name, location.description
        )
    }

    /// Pull the first inline image payload out of the reply
    fn extract_image_data(response: &super::GenerateContentResponse) -> Result<&str, GenError> {
        response
            .candidates
            .first()
            .and_then(|c| {
                c.content
                    .parts
                    .iter()
                    .find_map(|p| p.inline_data.as_ref())
            })
            .map(|d| d.data.as_str())
            .ok_or(GenError::EmptyResponse)
    }
}

#[async_trait]
impl ImageSource for ImageClient {
    async fn generate_image(&self, location: &Location) -> Result<PathBuf, GenError> {
        let request = GenerateContentRequest::from_prompt(
            Self::prompt(location),
            Some(json!({ "imageConfig": { "aspectRatio": "16:9" } })),
        );

        let url = self.config.endpoint(&self.config.image_model);
        let response = post_generate(&self.client, &url, &request).await?;

        let data = Self::extract_image_data(&response)?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| GenError::Parse(format!("base64 decode error: {e}")))?;

        tokio::fs::create_dir_all(&self.session_dir)
            .await
            .map_err(|e| GenError::Io(e.to_string()))?;
        let path = self
            .session_dir
            .join(format!("{}.png", sanitize_filename(&location.name)));
        tokio::fs::write(&path, &decoded)
            .await
            .map_err(|e| GenError::Io(e.to_string()))?;

        debug!(path = %path.display(), bytes = decoded.len(), "photo saved");
        Ok(path)
    }
}

/// Make a location name safe to use as a filename
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use crate::quiz::types::fixtures::location;

    use super::super::{Candidate, GenerateContentResponse, InlineData, WireContent, WirePart};
    use super::*;

    #[test]
    fn prompt_forbids_text_and_names_the_place() {
        let prompt = ImageClient::prompt(&location("Eiffel Tower, Paris", 0));
        assert!(prompt.contains("Eiffel Tower, Paris"));
        assert!(prompt.contains("NO TEXT, NO SIGNS, NO UI"));
    }

    #[test]
    fn inline_data_is_extracted_from_any_part() {
        let response = GenerateContentResponse {
            candidates: vec![Candidate {
                content: WireContent {
                    parts: vec![
                        WirePart {
                            text: Some("here is your photo".to_string()),
                            inline_data: None,
                        },
                        WirePart {
                            text: None,
                            inline_data: Some(InlineData {
                                mime_type: Some("image/png".to_string()),
                                data: "aGVsbG8=".to_string(),
                            }),
                        },
                    ],
                },
            }],
        };
        assert_eq!(
            ImageClient::extract_image_data(&response).unwrap(),
            "aGVsbG8="
        );
    }

    #[test]
    fn missing_image_data_is_a_failure_not_an_empty_result() {
        let response = GenerateContentResponse {
            candidates: vec![Candidate {
                content: WireContent {
                    parts: vec![WirePart {
                        text: Some("sorry, no image".to_string()),
                        inline_data: None,
                    }],
                },
            }],
        };
        assert!(matches!(
            ImageClient::extract_image_data(&response),
            Err(GenError::EmptyResponse)
        ));
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("Rio de Janeiro!"), "rio_de_janeiro_");
        assert_eq!(sanitize_filename("Ulan-Ude"), "ulan-ude");
    }
}
