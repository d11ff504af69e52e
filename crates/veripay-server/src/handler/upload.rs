//! Chunked receipt upload handler.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::multipart::{Field, Multipart};
use axum::routing::post;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use veripay_core::{Error, Result};
use veripay_upload::{ChunkOutcome, IncomingChunk, UploadManager};

use crate::handler::response::Envelope;
use crate::state::AppState;

const TRACING_TARGET: &str = "veripay_server::upload";

/// Client payload riding on each chunk.
///
/// Its `TUID` field carries the upload session id, not a transaction
/// identifier; the name is a leftover the clients still send.
#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(rename = "TUID", default)]
    sid: Option<String>,
}

/// Multipart fields of one chunk request, collected before validation.
#[derive(Default)]
struct ChunkForm {
    data: Option<Bytes>,
    index: Option<String>,
    total: Option<String>,
    file_name: Option<String>,
    payload: Option<String>,
}

/// Accepts one chunk of a receipt upload.
///
/// Intermediate chunks answer with a progress envelope; the chunk that
/// completes the set answers with the reassembled artifact path. Failures
/// still answer HTTP 200 with a failure envelope.
async fn upload_chunk(
    State(upload): State<Arc<UploadManager>>,
    multipart: Multipart,
) -> Envelope {
    match process_chunk(&upload, multipart).await {
        Ok(envelope) => envelope,
        Err(error) => Envelope::failure_from(&error),
    }
}

async fn process_chunk(upload: &UploadManager, mut multipart: Multipart) -> Result<Envelope> {
    let form = collect_form(&mut multipart).await?;

    let (Some(data), Some(index), Some(total), Some(file_name), Some(payload)) =
        (form.data, form.index, form.total, form.file_name, form.payload)
    else {
        return Err(Error::invalid_input().with_message("missing required upload fields"));
    };

    let index: u32 = index
        .trim()
        .parse()
        .map_err(|_| Error::invalid_input().with_message("chunk counters must be integers"))?;
    let total: u32 = total
        .trim()
        .parse()
        .map_err(|_| Error::invalid_input().with_message("chunk counters must be integers"))?;

    let payload: ChunkPayload = serde_json::from_str(&payload).map_err(|err| {
        Error::invalid_input()
            .with_message("payload is not valid json")
            .with_source(err)
    })?;
    let Some(sid) = payload.sid.filter(|sid| !sid.is_empty()) else {
        return Err(Error::invalid_input().with_message("missing session id in payload"));
    };

    tracing::debug!(
        target: TRACING_TARGET,
        sid = %sid,
        index,
        total,
        size = data.len(),
        "chunk accepted for reassembly"
    );

    let outcome = upload
        .submit(IncomingChunk {
            sid: sid.clone(),
            file_name,
            index,
            total,
            data,
        })
        .await?;

    Ok(match outcome {
        ChunkOutcome::Progress { received, total } => {
            tracing::debug!(
                target: TRACING_TARGET,
                sid = %sid,
                received,
                total,
                "upload in progress"
            );
            Envelope::progress(index + 1, total, &sid)
        }
        ChunkOutcome::Complete { artifact } => {
            tracing::info!(
                target: TRACING_TARGET,
                sid = %sid,
                artifact = %artifact.display(),
                "upload complete"
            );
            Envelope::success(Value::String(artifact.display().to_string()), "upload complete")
        }
    })
}

/// Drains the multipart stream into the known fields, skipping strangers.
async fn collect_form(multipart: &mut Multipart) -> Result<ChunkForm> {
    let mut form = ChunkForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        Error::invalid_input()
            .with_message("malformed multipart body")
            .with_source(err)
    })? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("CHUNK") => form.data = Some(read_bytes(field).await?),
            Some("CHUNK_IDX") => form.index = Some(read_text(field).await?),
            Some("CHUNK_TOTAL") => form.total = Some(read_text(field).await?),
            Some("FILENAME") => form.file_name = Some(read_text(field).await?),
            Some("PAYLOAD") => form.payload = Some(read_text(field).await?),
            _ => {}
        }
    }

    Ok(form)
}

async fn read_bytes(field: Field<'_>) -> Result<Bytes> {
    field.bytes().await.map_err(|err| {
        Error::invalid_input()
            .with_message("unreadable multipart field")
            .with_source(err)
    })
}

async fn read_text(field: Field<'_>) -> Result<String> {
    field.text().await.map_err(|err| {
        Error::invalid_input()
            .with_message("unreadable multipart field")
            .with_source(err)
    })
}

/// Returns a [`Router`] with the chunk upload route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/verify/img", post(upload_chunk))
}

#[cfg(test)]
mod tests {
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::Value;

    use crate::handler::test::create_test_context;

    fn chunk_form(sid: &str, index: u32, total: u32, data: &[u8]) -> MultipartForm {
        MultipartForm::new()
            .add_text("CHUNK_IDX", index.to_string())
            .add_text("CHUNK_TOTAL", total.to_string())
            .add_text("FILENAME", "receipt.png")
            .add_text("PAYLOAD", format!(r#"{{"TUID":"{sid}"}}"#))
            .add_part(
                "CHUNK",
                Part::bytes(data.to_vec())
                    .file_name("receipt.png")
                    .mime_type("image/png"),
            )
    }

    #[tokio::test]
    async fn single_chunk_upload_completes_immediately() -> anyhow::Result<()> {
        let ctx = create_test_context()?;

        let response = ctx
            .server
            .post("/verify/img")
            .multipart(chunk_form("sid-solo", 0, 1, b"one whole receipt"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["validity"], "true");
        assert_eq!(body["data"]["FNM"], "");
        assert_eq!(body["data"]["message"], "upload complete");

        let artifact = body["data"]["DATA"].as_str().unwrap().to_owned();
        assert_eq!(std::fs::read(&artifact)?, b"one whole receipt");
        Ok(())
    }

    #[tokio::test]
    async fn chunks_report_progress_until_the_last_arrives() -> anyhow::Result<()> {
        let ctx = create_test_context()?;

        let response = ctx
            .server
            .post("/verify/img")
            .multipart(chunk_form("sid-multi", 0, 3, b"first-"))
            .await;
        let body: Value = response.json();
        assert_eq!(body["validity"], "progress");
        assert_eq!(body["data"]["DATA"]["chunk"], 1);
        assert_eq!(body["data"]["DATA"]["total"], 3);
        assert_eq!(body["data"]["DATA"]["sid"], "sid-multi");

        let response = ctx
            .server
            .post("/verify/img")
            .multipart(chunk_form("sid-multi", 2, 3, b"third"))
            .await;
        let body: Value = response.json();
        assert_eq!(body["validity"], "progress");
        // Reports the accepted chunk's position, not a stored count.
        assert_eq!(body["data"]["DATA"]["chunk"], 3);

        let response = ctx
            .server
            .post("/verify/img")
            .multipart(chunk_form("sid-multi", 1, 3, b"second-"))
            .await;
        let body: Value = response.json();
        assert_eq!(body["validity"], "true");

        let artifact = body["data"]["DATA"].as_str().unwrap().to_owned();
        assert_eq!(std::fs::read(&artifact)?, b"first-second-third");
        Ok(())
    }

    #[tokio::test]
    async fn missing_fields_fail_without_a_session() -> anyhow::Result<()> {
        let ctx = create_test_context()?;

        let form = MultipartForm::new()
            .add_text("CHUNK_IDX", "0")
            .add_text("FILENAME", "receipt.png");

        let response = ctx.server.post("/verify/img").multipart(form).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["validity"], "false");
        assert!(body["data"]["DATA"].is_null());
        assert_eq!(body["data"]["message"], "missing required upload fields");
        Ok(())
    }

    #[tokio::test]
    async fn payload_without_a_session_id_is_rejected() -> anyhow::Result<()> {
        let ctx = create_test_context()?;

        let form = MultipartForm::new()
            .add_text("CHUNK_IDX", "0")
            .add_text("CHUNK_TOTAL", "1")
            .add_text("FILENAME", "receipt.png")
            .add_text("PAYLOAD", "{}")
            .add_part("CHUNK", Part::bytes(b"data".to_vec()));

        let response = ctx.server.post("/verify/img").multipart(form).await;

        let body: Value = response.json();
        assert_eq!(body["validity"], "false");
        assert_eq!(body["data"]["message"], "missing session id in payload");
        Ok(())
    }

    #[tokio::test]
    async fn malformed_payload_json_is_rejected() -> anyhow::Result<()> {
        let ctx = create_test_context()?;

        let form = MultipartForm::new()
            .add_text("CHUNK_IDX", "0")
            .add_text("CHUNK_TOTAL", "1")
            .add_text("FILENAME", "receipt.png")
            .add_text("PAYLOAD", "not json at all")
            .add_part("CHUNK", Part::bytes(b"data".to_vec()));

        let response = ctx.server.post("/verify/img").multipart(form).await;

        let body: Value = response.json();
        assert_eq!(body["validity"], "false");
        assert_eq!(body["data"]["message"], "payload is not valid json");
        Ok(())
    }

    #[tokio::test]
    async fn counters_must_be_integers() -> anyhow::Result<()> {
        let ctx = create_test_context()?;

        let form = MultipartForm::new()
            .add_text("CHUNK_IDX", "zero")
            .add_text("CHUNK_TOTAL", "1")
            .add_text("FILENAME", "receipt.png")
            .add_text("PAYLOAD", r#"{"TUID":"sid-nan"}"#)
            .add_part("CHUNK", Part::bytes(b"data".to_vec()));

        let response = ctx.server.post("/verify/img").multipart(form).await;

        let body: Value = response.json();
        assert_eq!(body["validity"], "false");
        assert_eq!(body["data"]["message"], "chunk counters must be integers");
        Ok(())
    }

    #[tokio::test]
    async fn out_of_range_index_is_a_client_error() -> anyhow::Result<()> {
        let ctx = create_test_context()?;

        let response = ctx
            .server
            .post("/verify/img")
            .multipart(chunk_form("sid-range", 7, 2, b"stray"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["validity"], "false");
        assert!(body["data"]["DATA"].is_null());
        assert_ne!(body["data"]["message"], "");
        Ok(())
    }
}
