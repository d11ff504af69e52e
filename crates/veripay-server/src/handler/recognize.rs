//! Receipt recognition handler.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use veripay_core::Error;
use veripay_pipeline::RecognitionPipeline;

use crate::handler::response::Envelope;
use crate::state::AppState;

const TRACING_TARGET: &str = "veripay_server::recognize";

/// Recognition request for a previously uploaded artifact.
#[derive(Debug, Deserialize)]
struct RecognizeRequest {
    /// Artifact path returned by the final upload chunk.
    #[serde(rename = "IMG_PATH", default)]
    image_path: Option<String>,
}

/// Runs the staged recognition pipeline over an uploaded artifact.
///
/// Success answers with the verified identifier; every failure answers
/// HTTP 200 with a failure envelope whose message says why.
async fn recognize(
    State(pipeline): State<Arc<RecognitionPipeline>>,
    Json(request): Json<RecognizeRequest>,
) -> Envelope {
    let Some(image_path) = request.image_path.filter(|path| !path.is_empty()) else {
        return Envelope::failure_from(&Error::invalid_input().with_message("missing image path"));
    };

    tracing::debug!(
        target: TRACING_TARGET,
        image_path = %image_path,
        "recognition requested"
    );

    match pipeline.recognize(Path::new(&image_path)).await {
        Ok(report) => Envelope::success(
            Value::String(report.tuid.as_str().to_owned()),
            "identifier recognized",
        ),
        Err(error) => Envelope::failure_from(&error),
    }
}

/// Returns a [`Router`] with the recognition route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/verify/ocr", post(recognize))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use veripay_core::Verification;

    use crate::handler::test::create_test_context;

    const RECEIPT_TEXT: &str = "settlement complete\nB111122223333444455\nthank you";

    #[tokio::test]
    async fn missing_image_path_is_rejected() -> anyhow::Result<()> {
        let ctx = create_test_context()?;

        let response = ctx.server.post("/verify/ocr").json(&json!({})).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["validity"], "false");
        assert!(body["data"]["DATA"].is_null());
        assert_eq!(body["data"]["message"], "missing image path");
        assert_eq!(ctx.local.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn recognized_identifier_round_trips() -> anyhow::Result<()> {
        let ctx = create_test_context()?;
        let artifact = ctx.scratch.path().join("receipt_7.png");
        std::fs::write(&artifact, b"not really pixels")?;

        ctx.local.push_text(RECEIPT_TEXT);
        ctx.verifier.push(Ok(Verification::Matched));

        let response = ctx
            .server
            .post("/verify/ocr")
            .json(&json!({ "IMG_PATH": artifact.display().to_string() }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["validity"], "true");
        assert_eq!(body["data"]["DATA"], "B111122223333444455");
        assert_eq!(body["data"]["message"], "identifier recognized");

        // The pipeline owns artifact cleanup on every terminal outcome.
        assert!(!artifact.exists());
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_image_advises_recapture() -> anyhow::Result<()> {
        let ctx = create_test_context()?;
        let artifact = ctx.scratch.path().join("receipt_8.png");
        std::fs::write(&artifact, b"not really pixels")?;

        ctx.local.push_text("nothing identifier shaped in here");

        let response = ctx
            .server
            .post("/verify/ocr")
            .json(&json!({ "IMG_PATH": artifact.display().to_string() }))
            .await;

        let body: Value = response.json();
        assert_eq!(body["validity"], "false");
        assert!(body["data"]["DATA"].is_null());
        assert!(body["data"]["message"].as_str().unwrap().contains("retake"));
        assert_eq!(ctx.verifier.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn nonexistent_path_fails_with_its_message() -> anyhow::Result<()> {
        let ctx = create_test_context()?;

        let response = ctx
            .server
            .post("/verify/ocr")
            .json(&json!({ "IMG_PATH": "/nowhere/receipt.png" }))
            .await;

        let body: Value = response.json();
        assert_eq!(body["validity"], "false");
        assert!(
            body["data"]["message"]
                .as_str()
                .unwrap()
                .contains("image not found")
        );
        assert_eq!(ctx.local.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn quota_exhaustion_uses_fixed_wording() -> anyhow::Result<()> {
        let ctx = create_test_context()?;
        let artifact = ctx.scratch.path().join("receipt_9.png");
        std::fs::write(&artifact, b"not really pixels")?;

        ctx.local.push_text(RECEIPT_TEXT);
        ctx.verifier.push(Ok(Verification::NotMatched));
        ctx.ledger.set_usage(950);

        let response = ctx
            .server
            .post("/verify/ocr")
            .json(&json!({ "IMG_PATH": artifact.display().to_string() }))
            .await;

        let body: Value = response.json();
        assert_eq!(body["validity"], "false");
        assert_eq!(
            body["data"]["message"],
            "monthly cloud recognition quota exhausted"
        );
        assert_eq!(ctx.cloud.calls(), 0);
        Ok(())
    }
}
