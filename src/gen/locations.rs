//! Location-list generation via the text model
//!
//! Asks the model for a batch of diverse quiz locations and constrains the
//! reply with a JSON response schema, so the payload deserializes straight
//! into [`Location`] records. The reply is validated before it reaches the
//! controller: a short list or an out-of-range answer index is a failure,
//! not a degraded game.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::quiz::types::{Location, OPTIONS_PER_ROUND};

use super::{post_generate, GenConfig, GenError, GenerateContentRequest, LocationSource};

/// Client for the location-list capability
pub struct LocationClient {
    config: GenConfig,
    client: reqwest::Client,
}

impl LocationClient {
    pub fn new(config: GenConfig) -> Result<Self, GenError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GenError::Network(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn prompt(count: usize, exclude_names: &[String]) -> String {
        let mut prompt = format!(
            "Generate {count} diverse geographic locations worldwide for a quiz.\n\
             For each:\n\
             - Provide 4 plausible options (countries/cities).\n\
             - Identify the correct index (0-3).\n\
             - Give a brief atmosphere description for image generation.\n\
             - Return as JSON."
        );
        if !exclude_names.is_empty() {
            prompt.push_str("\nDo not reuse these locations: ");
            prompt.push_str(&exclude_names.join(", "));
            prompt.push('.');
        }
        prompt
    }

    fn response_schema() -> serde_json::Value {
        json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "lat": { "type": "NUMBER" },
                    "lng": { "type": "NUMBER" },
                    "name": { "type": "STRING" },
                    "options": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "correctOptionIndex": { "type": "INTEGER" },
                    "description": { "type": "STRING" }
                },
                "required": ["lat", "lng", "name", "options", "correctOptionIndex", "description"]
            }
        })
    }
}

#[async_trait]
impl LocationSource for LocationClient {
    async fn generate_locations(
        &self,
        count: usize,
        exclude_names: &[String],
    ) -> Result<Vec<Location>, GenError> {
        let request = GenerateContentRequest::from_prompt(
            Self::prompt(count, exclude_names),
            Some(json!({
                "responseMimeType": "application/json",
                "responseSchema": Self::response_schema(),
            })),
        );

        let url = self.config.endpoint(&self.config.text_model);
        let response = post_generate(&self.client, &url, &request).await?;

        let text = response
            .candidates
            .first()
            .and_then(|c| c.content.parts.iter().find_map(|p| p.text.as_deref()))
            .ok_or(GenError::EmptyResponse)?;

        debug!(bytes = text.len(), "location list received");

        let locations: Vec<Location> = serde_json::from_str(strip_code_fences(text))
            .map_err(|e| GenError::Parse(e.to_string()))?;
        validate_locations(locations, count)
    }
}

/// Some models wrap schema-constrained JSON in a markdown fence anyway
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Check the batch is usable: enough records, four options each, answer
/// index in range, nothing blank. Extra records beyond `count` are dropped.
fn validate_locations(mut locations: Vec<Location>, count: usize) -> Result<Vec<Location>, GenError> {
    if locations.len() < count {
        return Err(GenError::Malformed(format!(
            "expected {} locations, got {}",
            count,
            locations.len()
        )));
    }
    locations.truncate(count);
    for (i, loc) in locations.iter().enumerate() {
        if loc.name.trim().is_empty() {
            return Err(GenError::Malformed(format!("location {i} has no name")));
        }
        if loc.options.len() != OPTIONS_PER_ROUND {
            return Err(GenError::Malformed(format!(
                "location {i} ({}) has {} options",
                loc.name,
                loc.options.len()
            )));
        }
        if loc.correct_option_index >= loc.options.len() {
            return Err(GenError::Malformed(format!(
                "location {i} ({}) has answer index {} out of range",
                loc.name, loc.correct_option_index
            )));
        }
    }
    Ok(locations)
}

#[cfg(test)]
mod tests {
    use crate::quiz::types::fixtures::location;

    use super::*;

    #[test]
    fn prompt_mentions_count_and_exclusions() {
        let prompt = LocationClient::prompt(10, &["Kyoto".to_string(), "Lima".to_string()]);
        assert!(prompt.contains("10 diverse geographic locations"));
        assert!(prompt.contains("Kyoto, Lima"));

        let bare = LocationClient::prompt(5, &[]);
        assert!(!bare.contains("Do not reuse"));
    }

    #[test]
    fn valid_batch_passes_and_is_truncated_to_count() {
        let batch: Vec<Location> = (0..12).map(|i| location(&format!("Place {i}"), 1)).collect();
        let out = validate_locations(batch, 10).unwrap();
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn short_batch_is_rejected() {
        let batch: Vec<Location> = (0..4).map(|i| location(&format!("Place {i}"), 0)).collect();
        assert!(matches!(
            validate_locations(batch, 10),
            Err(GenError::Malformed(_))
        ));
    }

    #[test]
    fn wrong_option_count_is_rejected() {
        let mut bad = location("Oslo", 0);
        bad.options.pop();
        assert!(matches!(
            validate_locations(vec![bad], 1),
            Err(GenError::Malformed(_))
        ));
    }

    #[test]
    fn out_of_range_answer_index_is_rejected() {
        let mut bad = location("Oslo", 0);
        bad.correct_option_index = 4;
        assert!(matches!(
            validate_locations(vec![bad], 1),
            Err(GenError::Malformed(_))
        ));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut bad = location("  ", 0);
        bad.name = "  ".to_string();
        assert!(matches!(
            validate_locations(vec![bad], 1),
            Err(GenError::Malformed(_))
        ));
    }

    #[test]
    fn code_fences_are_stripped() {
        assert_eq!(strip_code_fences("```json\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("  [3]  "), "[3]");
    }
}
