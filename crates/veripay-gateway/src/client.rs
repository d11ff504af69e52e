//! Signed HTTP client for the ledger gateway.

use reqwest::{Client as HttpClient, ClientBuilder};
use serde::Serialize;
use url::Url;
use uuid::Uuid;
use veripay_core::{Error, Result};

use crate::sign::sign_body;
use crate::wire::{GatewayEnvelope, QueryRequest};
use crate::{GatewayConfig, TRACING_TARGET};

/// Client for the ledger gateway's query and verification endpoints.
///
/// Every request is a signed JSON POST: a fresh v7 UUID correlation id, the
/// unix-second timestamp, the shared API key, and an HMAC-SHA256 signature
/// over the body travel as headers alongside it.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: HttpClient,
    config: GatewayConfig,
    query_url: Option<Url>,
    verify_url: Option<Url>,
}

impl GatewayClient {
    /// Creates a client from the given configuration.
    ///
    /// Only the URLs are validated here. Missing credentials surface per
    /// call, so the rest of the service boots without them.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        tracing::debug!(
            target: TRACING_TARGET,
            query_configured = config.query_url.is_some(),
            verify_configured = config.verify_url.is_some(),
            "creating gateway client"
        );

        let query_url = parse_configured(config.query_url.as_deref(), "gateway query url")?;
        let verify_url = parse_configured(config.verify_url.as_deref(), "gateway verify url")?;

        let http = ClientBuilder::new()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("veripay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| {
                Error::configuration()
                    .with_message("failed to build the gateway http client")
                    .with_source(err)
            })?;

        Ok(Self {
            http,
            config,
            query_url,
            verify_url,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub(crate) fn verify_url(&self) -> Result<&Url> {
        self.verify_url.as_ref().ok_or_else(|| {
            Error::configuration().with_message("gateway verify url is not configured")
        })
    }

    /// Runs one SQL statement through the gateway's query endpoint.
    ///
    /// The gateway reports statement failures inside a well-formed envelope;
    /// those come back as collaborator errors too, since the caller cannot
    /// act on them any differently than on a transport fault.
    pub(crate) async fn query(
        &self,
        db: &str,
        statement: impl Into<String>,
    ) -> Result<GatewayEnvelope> {
        let url = self
            .query_url
            .as_ref()
            .ok_or_else(|| {
                Error::configuration().with_message("gateway query url is not configured")
            })?
            .clone();

        let request_id = Uuid::now_v7();
        let request = QueryRequest::new(db, statement, request_id.to_string());

        let envelope = self.post_signed(&url, request_id, &request).await?;
        if !envelope.is_valid() {
            return Err(Error::collaborator().with_message(match envelope.message() {
                Some(message) => format!("gateway rejected the query: {message}"),
                None => "gateway rejected the query".to_owned(),
            }));
        }
        Ok(envelope)
    }

    /// POSTs a signed JSON body and parses the shared response envelope.
    pub(crate) async fn post_signed(
        &self,
        url: &Url,
        request_id: Uuid,
        body: &impl Serialize,
    ) -> Result<GatewayEnvelope> {
        let api_key = self.config.api_key().ok_or_else(|| {
            Error::configuration().with_message("gateway api key is not configured")
        })?;
        let secret = self.config.secret().ok_or_else(|| {
            Error::configuration().with_message("gateway secret is not configured")
        })?;

        let bytes = serde_json::to_vec(body).map_err(|err| {
            Error::collaborator()
                .with_message("failed to serialize the gateway request")
                .with_source(err)
        })?;
        let timestamp = jiff::Timestamp::now().as_second();
        let signature = sign_body(secret, &bytes);

        tracing::debug!(
            target: TRACING_TARGET,
            request_id = %request_id,
            url = %url,
            "sending signed gateway request"
        );

        let response = self
            .http
            .post(url.clone())
            .header("Content-Type", "application/json")
            .header("X-Gateway-Request-Id", request_id.to_string())
            .header("X-Gateway-Timestamp", timestamp.to_string())
            .header("X-Gateway-Api-Key", api_key)
            .header("X-Gateway-Signature", signature)
            .body(bytes)
            .send()
            .await
            .map_err(|err| {
                let message = if err.is_timeout() {
                    "gateway request timed out"
                } else if err.is_connect() {
                    "gateway connection failed"
                } else {
                    "gateway request failed"
                };
                Error::collaborator().with_message(message).with_source(err)
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                target: TRACING_TARGET,
                request_id = %request_id,
                status = status.as_u16(),
                "gateway returned an error status"
            );
            return Err(Error::collaborator().with_message(format!("gateway returned {status}")));
        }

        response.json().await.map_err(|err| {
            Error::collaborator()
                .with_message("gateway response did not parse")
                .with_source(err)
        })
    }
}

fn parse_configured(url: Option<&str>, label: &str) -> Result<Option<Url>> {
    let Some(url) = url.filter(|url| !url.is_empty()) else {
        return Ok(None);
    };
    Url::parse(url).map(Some).map_err(|err| {
        Error::configuration()
            .with_message(format!("{label} is not a valid url"))
            .with_source(err)
    })
}
