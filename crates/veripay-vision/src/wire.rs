//! Request and response shapes of the annotate endpoint.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Language hints sent with every request.
const LANGUAGE_HINTS: [&str; 2] = ["ko", "en"];

/// Feature identifier for full-text detection.
const TEXT_DETECTION: &str = "TEXT_DETECTION";

/// Top-level annotate request: a batch of per-image requests.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnnotateRequest {
    pub requests: Vec<ImageRequest>,
}

impl AnnotateRequest {
    /// Builds a single-image text-detection request.
    pub(crate) fn text_detection(image: &[u8]) -> Self {
        Self {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: vec![Feature {
                    kind: TEXT_DETECTION.to_owned(),
                }],
                image_context: ImageContext {
                    language_hints: LANGUAGE_HINTS.iter().map(|hint| (*hint).to_owned()).collect(),
                },
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageRequest {
    pub image: ImageContent,
    pub features: Vec<Feature>,
    pub image_context: ImageContext,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ImageContent {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageContext {
    pub language_hints: Vec<String>,
}

/// Top-level annotate response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AnnotateResponse {
    #[serde(default)]
    pub responses: Vec<ImageResponse>,
}

/// Per-image response entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageResponse {
    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,
    #[serde(default)]
    pub error: Option<ProviderStatus>,
}

impl ImageResponse {
    /// The full recognized text. The first annotation spans the whole
    /// image; later entries repeat it word by word.
    pub(crate) fn full_text(&self) -> Option<&str> {
        self.text_annotations
            .first()
            .map(|annotation| annotation.description.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TextAnnotation {
    #[serde(default)]
    pub description: String,
}

/// Provider-reported failure for one image.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProviderStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_matches_the_annotate_wire_shape() {
        let value = serde_json::to_value(AnnotateRequest::text_detection(b"img")).unwrap();

        assert_eq!(value["requests"][0]["image"]["content"], "aW1n");
        assert_eq!(value["requests"][0]["features"][0]["type"], "TEXT_DETECTION");
        assert_eq!(
            value["requests"][0]["imageContext"]["languageHints"],
            serde_json::json!(["ko", "en"])
        );
    }

    #[test]
    fn first_annotation_carries_the_full_text() {
        let response: AnnotateResponse = serde_json::from_str(
            r#"{
                "responses": [{
                    "textAnnotations": [
                        {"description": "합계 B123456789012345678\n카드", "locale": "ko"},
                        {"description": "합계"}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let entry = &response.responses[0];
        assert_eq!(entry.full_text(), Some("합계 B123456789012345678\n카드"));
    }

    #[test]
    fn empty_annotations_yield_no_text() {
        let response: AnnotateResponse = serde_json::from_str(r#"{"responses": [{}]}"#).unwrap();

        let entry = &response.responses[0];
        assert_eq!(entry.full_text(), None);
        assert!(entry.error.is_none());
    }

    #[test]
    fn provider_errors_are_parsed() {
        let response: AnnotateResponse = serde_json::from_str(
            r#"{
                "responses": [{
                    "error": {"code": 7, "message": "permission denied"}
                }]
            }"#,
        )
        .unwrap();

        let error = response.responses[0].error.as_ref().unwrap();
        assert_eq!(error.code, 7);
        assert_eq!(error.message, "permission denied");
    }
}
