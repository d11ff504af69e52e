//! Legacy response envelope shared by every route.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use veripay_core::{Error, ErrorKind};

const TRACING_TARGET: &str = "veripay_server::response";

/// Advice returned when no engine produced a usable identifier.
const RETAKE_ADVICE: &str = "the image could not be read clearly, please retake the photo";

/// Advice returned when a recognized identifier failed verification.
const UNVERIFIED_ADVICE: &str =
    "the recognized identifier does not match an issued transaction, please retake the photo";

/// Wire envelope of the service this replaces.
///
/// Always delivered with HTTP 200; clients dispatch on `validity`, not on
/// the status code.
#[derive(Debug, Clone, Serialize)]
#[must_use = "responses do nothing unless you return them"]
pub struct Envelope {
    validity: &'static str,
    data: EnvelopeData,
}

#[derive(Debug, Clone, Serialize)]
struct EnvelopeData {
    #[serde(rename = "DATA")]
    payload: Value,
    /// Legacy field the old clients still deserialize, always empty.
    #[serde(rename = "FNM")]
    file_name: String,
    message: String,
}

impl Envelope {
    fn new(validity: &'static str, payload: Value, message: String) -> Self {
        Self {
            validity,
            data: EnvelopeData {
                payload,
                file_name: String::new(),
                message,
            },
        }
    }

    /// Creates a success envelope carrying the given payload.
    pub fn success(payload: Value, message: impl Into<String>) -> Self {
        Self::new("true", payload, message.into())
    }

    /// Creates a progress envelope for an intermediate upload chunk.
    ///
    /// `chunk` is the one-based position of the chunk just accepted, not a
    /// count of chunks stored so far.
    pub fn progress(chunk: u32, total: u32, sid: &str) -> Self {
        let payload = json!({ "chunk": chunk, "total": total, "sid": sid });
        Self::new("progress", payload, "chunk received".to_owned())
    }

    /// Creates a failure envelope with a null payload.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new("false", Value::Null, message.into())
    }

    /// Maps an upload or recognition error onto a failure envelope.
    ///
    /// Kinds carrying user advice get fixed wording; plumbing faults stay
    /// opaque; the rest surface the error's own message.
    pub fn failure_from(error: &Error) -> Self {
        let message = match error.kind() {
            ErrorKind::Ambiguous => RETAKE_ADVICE.to_owned(),
            ErrorKind::Unverified => UNVERIFIED_ADVICE.to_owned(),
            ErrorKind::QuotaExceeded => "monthly cloud recognition quota exhausted".to_owned(),
            ErrorKind::Configuration | ErrorKind::Timeout | ErrorKind::Unknown => {
                "internal error".to_owned()
            }
            _ => error
                .message
                .clone()
                .unwrap_or_else(|| "request failed".to_owned()),
        };

        Self::failure(message)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        if self.validity == "false" {
            tracing::warn!(
                target: TRACING_TARGET,
                message = %self.data.message,
                "returning failure envelope"
            );
        }

        (StatusCode::OK, Json(self)).into_response()
    }
}
