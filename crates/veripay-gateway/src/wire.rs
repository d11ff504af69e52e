//! Gateway request envelopes and the shared response shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generic query envelope accepted by the gateway's query endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) struct QueryRequest {
    pub method: &'static str,
    pub run: &'static str,
    pub direct: &'static str,
    pub view: &'static str,
    pub lang: &'static str,
    pub db: String,
    pub qry: String,
    pub tuid: String,
}

impl QueryRequest {
    /// Builds a direct-execution query against the given database key.
    pub(crate) fn new(
        db: impl Into<String>,
        query: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            method: "POST",
            run: "Y",
            direct: "Y",
            view: "N",
            lang: "KR",
            db: db.into(),
            qry: query.into(),
            tuid: request_id.into(),
        }
    }
}

/// Identifier-verification request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) struct VerifyRequest {
    pub debug: &'static str,
    pub payload: VerifyPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) struct VerifyPayload {
    pub tuid: String,
}

impl VerifyRequest {
    pub(crate) fn new(tuid: impl Into<String>) -> Self {
        Self {
            debug: "Y",
            payload: VerifyPayload { tuid: tuid.into() },
        }
    }
}

/// Response envelope shared by every gateway endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GatewayEnvelope {
    #[serde(default)]
    pub validity: String,
    #[serde(default)]
    pub data: Option<GatewayData>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GatewayData {
    #[serde(rename = "DATA", default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl GatewayEnvelope {
    /// Whether the gateway accepted the request.
    pub(crate) fn is_valid(&self) -> bool {
        self.validity == "true"
    }

    /// The payload rows, when the gateway returned any.
    pub(crate) fn payload(&self) -> Option<&Value> {
        self.data.as_ref()?.data.as_ref().filter(|value| !value.is_null())
    }

    /// Operator-facing message carried in the envelope, when present.
    pub(crate) fn message(&self) -> Option<&str> {
        self.data
            .as_ref()?
            .message
            .as_deref()
            .filter(|message| !message.is_empty())
    }

    /// The count surfaced by `SELECT COUNT(*) as TUID` queries, tolerant
    /// of the gateway stringifying numbers.
    pub(crate) fn first_count(&self) -> Option<u64> {
        match self.payload()?.get(0)?.get("TUID")? {
            Value::Number(count) => count.as_u64(),
            Value::String(count) => count.parse().ok(),
            _ => None,
        }
    }
}
