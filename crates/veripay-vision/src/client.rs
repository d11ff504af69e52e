//! Vision REST client.

use jiff::SignedDuration;
use reqwest::{Client as HttpClient, ClientBuilder};
use url::Url;
use veripay_core::{EngineError, Error, Result};

use crate::wire::{AnnotateRequest, AnnotateResponse};
use crate::{TRACING_TARGET_CLIENT, VisionConfig};

/// Client for the Vision annotate endpoint.
#[derive(Debug, Clone)]
pub struct VisionClient {
    http_client: HttpClient,
    annotate_url: Url,
    config: VisionConfig,
}

impl VisionClient {
    /// Creates a client from the given configuration.
    ///
    /// Fails when the endpoint does not parse or the HTTP client cannot be
    /// built. A missing API key is not an error here; it surfaces per
    /// request, so the rest of the service runs without cloud fallback.
    pub fn new(config: VisionConfig) -> Result<Self> {
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            endpoint = %config.endpoint,
            "creating vision client"
        );

        let annotate_url = format!("{}/images:annotate", config.endpoint.trim_end_matches('/'));
        let annotate_url = Url::parse(&annotate_url).map_err(|err| {
            Error::configuration()
                .with_message("vision endpoint is not a valid url")
                .with_source(err)
        })?;

        let http_client = ClientBuilder::new()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("veripay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| {
                Error::configuration()
                    .with_message("failed to build the vision http client")
                    .with_source(err)
            })?;

        Ok(Self {
            http_client,
            annotate_url,
            config,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    /// Cheap readiness probe: verifies a key is configured without spending
    /// a billed request.
    pub fn health_check(&self) -> Result<(), EngineError> {
        self.config
            .api_key()
            .map(|_| ())
            .ok_or(EngineError::CredentialsMissing)
    }

    /// Detects text in one image, returning the full recognized text.
    pub async fn detect_text(&self, image: &[u8]) -> Result<String, EngineError> {
        let api_key = self
            .config
            .api_key()
            .ok_or(EngineError::CredentialsMissing)?;

        let request = AnnotateRequest::text_detection(image);
        let response = self
            .http_client
            .post(self.annotate_url.clone())
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                target: TRACING_TARGET_CLIENT,
                status = status.as_u16(),
                "annotate request rejected: {body}"
            );
            return Err(EngineError::provider(format!("vision api returned {status}")));
        }

        let annotate: AnnotateResponse = response.json().await.map_err(|err| {
            EngineError::provider_with_source("vision response did not parse", err)
        })?;

        let Some(entry) = annotate.responses.into_iter().next() else {
            return Err(EngineError::provider("vision response contained no entries"));
        };
        if let Some(error) = entry.error {
            return Err(EngineError::provider(format!(
                "vision provider error {}: {}",
                error.code, error.message
            )));
        }

        match entry.full_text() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_owned()),
            _ => Err(EngineError::NoText),
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> EngineError {
        if err.is_timeout() {
            let timeout = SignedDuration::try_from(self.config.timeout())
                .unwrap_or(SignedDuration::MAX);
            EngineError::Timeout { timeout }
        } else {
            EngineError::provider_with_source("annotate request failed", err)
        }
    }
}

#[cfg(test)]
mod tests {
    use veripay_core::ErrorKind;

    use super::*;

    #[test]
    fn invalid_endpoint_is_rejected_at_construction() {
        let config = VisionConfig {
            endpoint: "not a url".to_owned(),
            ..VisionConfig::default()
        };

        let err = VisionClient::new(config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_network_activity() {
        let client = VisionClient::new(VisionConfig::default()).unwrap();

        let err = client.detect_text(b"img").await.unwrap_err();
        assert!(matches!(err, EngineError::CredentialsMissing));
    }

    #[test]
    fn health_check_requires_a_key() {
        let client = VisionClient::new(VisionConfig::default()).unwrap();
        assert!(matches!(
            client.health_check(),
            Err(EngineError::CredentialsMissing)
        ));

        let config = VisionConfig {
            api_key: Some("k".to_owned()),
            ..VisionConfig::default()
        };
        let client = VisionClient::new(config).unwrap();
        assert!(client.health_check().is_ok());
    }
}
