//! The caption record stored as a `<basename>.json` sidecar blob.

use serde::{Deserialize, Serialize};

pub const DEFAULT_DESCRIPTION: &str = "No description available";
pub const DEFAULT_CAPTION: &str = "No caption available";

/// Description/caption pair produced by the vision model for one image.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ImageMetadata {
    pub description: String,
    pub caption: String,
}

impl ImageMetadata {
    /// Build a record from a parsed model reply, substituting the documented
    /// defaults for any key that is missing or not a string.
    pub fn from_ai_reply(reply: &serde_json::Value) -> Self {
        Self {
            description: field_or(reply, "description", DEFAULT_DESCRIPTION),
            caption: field_or(reply, "caption", DEFAULT_CAPTION),
        }
    }
}

fn field_or(value: &serde_json::Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

/// Name of the metadata sidecar for an image blob: extension swapped for
/// `.json`, so `photo.png` pairs with `photo.json`.
pub fn sidecar_name(image_name: &str) -> String {
    match image_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.json"),
        _ => format!("{image_name}.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn uses_reply_values_when_present() {
        let meta = ImageMetadata::from_ai_reply(&json!({
            "description": "a red bicycle against a wall",
            "caption": "City bike",
        }));
        assert_eq!(meta.description, "a red bicycle against a wall");
        assert_eq!(meta.caption, "City bike");
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let meta = ImageMetadata::from_ai_reply(&json!({ "description": "just this" }));
        assert_eq!(meta.description, "just this");
        assert_eq!(meta.caption, DEFAULT_CAPTION);

        let meta = ImageMetadata::from_ai_reply(&json!({}));
        assert_eq!(meta.description, DEFAULT_DESCRIPTION);
        assert_eq!(meta.caption, DEFAULT_CAPTION);
    }

    #[test]
    fn non_string_values_fall_back_to_defaults() {
        let meta = ImageMetadata::from_ai_reply(&json!({ "description": 42, "caption": null }));
        assert_eq!(meta.description, DEFAULT_DESCRIPTION);
        assert_eq!(meta.caption, DEFAULT_CAPTION);
    }

    #[test]
    fn sidecar_swaps_the_last_extension() {
        assert_eq!(sidecar_name("photo.png"), "photo.json");
        assert_eq!(sidecar_name("archive.tar.gz"), "archive.tar.json");
        assert_eq!(sidecar_name("noext"), "noext.json");
    }

    #[test]
    fn round_trips_through_json() {
        let meta = ImageMetadata {
            description: "desc".into(),
            caption: "cap".into(),
        };
        let bytes = serde_json::to_vec(&meta).unwrap();
        let back: ImageMetadata = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, meta);
    }
}
