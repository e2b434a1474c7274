//! Vision model client used to describe uploaded images.
//!
//! `Captioner` is the seam the route layer depends on; `GeminiCaptioner`
//! implements it against the Gemini `generateContent` endpoint, sending the
//! fixed instruction prompt plus the resized image as inline data. The raw
//! text reply goes through [`clean_and_parse_json`], which extracts the first
//! top-level JSON object from whatever text the model produced.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Gemini API base URL.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Instruction sent with every image.
pub const CAPTION_PROMPT: &str = r#"Analyze the uploaded image and respond in the following JSON format:
{
    "description": "A concise description of the image",
    "caption": "A short caption for the image"
}"#;

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("AI API key not configured")]
    NotConfigured,
    #[error("network error: {0}")]
    Network(String),
    #[error("Gemini API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("model returned no text")]
    EmptyReply,
}

/// Anything that can produce a raw text description for an image.
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Return the model's raw text reply for the given image bytes.
    async fn describe_image(&self, image: &[u8], mime_type: &str)
    -> Result<String, CaptionError>;
}

/// Caption client backed by the Gemini API.
pub struct GeminiCaptioner {
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl GeminiCaptioner {
    /// Build a client. A missing key is allowed — calls fail with
    /// `NotConfigured` instead of the process refusing to start. No request
    /// timeout is configured.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            client: Client::new(),
        }
    }

    fn api_url(&self, key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, key
        )
    }
}

#[async_trait]
impl Captioner for GeminiCaptioner {
    async fn describe_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, CaptionError> {
        let key = self.api_key.as_deref().ok_or(CaptionError::NotConfigured)?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    ContentPart::Text {
                        text: CAPTION_PROMPT.to_string(),
                    },
                    ContentPart::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: general_purpose::STANDARD.encode(image),
                        },
                    },
                ],
            }],
        };

        tracing::debug!(
            model = %self.model,
            image_bytes = image.len(),
            "sending caption request to Gemini"
        );

        let response = self
            .client
            .post(self.api_url(key))
            .json(&request)
            .send()
            .await
            .map_err(|e| CaptionError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CaptionError::Api { status, body });
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| CaptionError::Network(e.to_string()))?;

        api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| {
                c.content.parts.into_iter().find_map(|p| match p {
                    ContentPart::Text { text } => Some(text),
                    _ => None,
                })
            })
            .ok_or(CaptionError::EmptyReply)
    }
}

/// Extract the first top-level JSON object from a raw model reply.
///
/// Trims whitespace, strips one leading/trailing code-fence token, then takes
/// the substring between the first `{` and the last `}` and parses it.
/// Returns `None` when the text is empty, no braces are found, or the
/// substring is not valid JSON, logging the reason.
pub fn clean_and_parse_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        warn!("empty AI response");
        return None;
    }

    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let inner = inner.strip_suffix("```").unwrap_or(inner);

    let (Some(start), Some(end)) = (inner.find('{'), inner.rfind('}')) else {
        warn!("no JSON object found in AI response");
        return None;
    };
    if end < start {
        warn!("no JSON object found in AI response");
        return None;
    }

    match serde_json::from_str(&inner[start..=end]) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("error parsing JSON from AI response: {err}");
            None
        }
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_fenced_json_reply() {
        let reply = "```json\n{\"description\":\"a\",\"caption\":\"b\"}\n```";
        let value = clean_and_parse_json(reply).unwrap();
        assert_eq!(value, json!({"description": "a", "caption": "b"}));
    }

    #[test]
    fn parses_bare_json_reply() {
        let value = clean_and_parse_json("{\"caption\": \"hi\"}").unwrap();
        assert_eq!(value["caption"], "hi");
    }

    #[test]
    fn extracts_object_embedded_in_prose() {
        let reply = "Sure! Here is the JSON you asked for: {\"caption\": \"x\"} Hope it helps.";
        let value = clean_and_parse_json(reply).unwrap();
        assert_eq!(value["caption"], "x");
    }

    #[test]
    fn no_braces_is_absent() {
        assert!(clean_and_parse_json("the model refused to answer").is_none());
    }

    #[test]
    fn empty_and_whitespace_replies_are_absent() {
        assert!(clean_and_parse_json("").is_none());
        assert!(clean_and_parse_json("   \n ").is_none());
    }

    #[test]
    fn malformed_json_is_absent() {
        assert!(clean_and_parse_json("{\"caption\": }").is_none());
    }

    #[test]
    fn reversed_braces_are_absent() {
        assert!(clean_and_parse_json("} nothing here {").is_none());
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let captioner = GeminiCaptioner::new(None, "gemini-1.5-flash");
        let err = captioner.describe_image(b"img", "image/png").await;
        assert!(matches!(err, Err(CaptionError::NotConfigured)));
    }
}
