//! Identifier verification through the gateway's verify endpoint.

use uuid::Uuid;
use veripay_core::{Result, Tuid, TuidVerifier, Verification};

use crate::TRACING_TARGET;
use crate::client::GatewayClient;
use crate::wire::{GatewayEnvelope, VerifyRequest};

/// Maps a well-formed envelope onto the verification outcome.
///
/// A `validity` other than `"true"` and a missing payload both mean the
/// identifier is unknown; only transport and envelope faults are errors.
fn verification_from(envelope: &GatewayEnvelope) -> Verification {
    if envelope.is_valid() && envelope.payload().is_some() {
        Verification::Matched
    } else {
        Verification::NotMatched
    }
}

#[async_trait::async_trait]
impl TuidVerifier for GatewayClient {
    async fn verify(&self, tuid: &Tuid) -> Result<Verification> {
        let url = self.verify_url()?.clone();
        let request_id = Uuid::now_v7();
        let request = VerifyRequest::new(tuid.as_str());

        let envelope = self.post_signed(&url, request_id, &request).await?;
        let verification = verification_from(&envelope);

        tracing::debug!(
            target: TRACING_TARGET,
            tuid = %tuid,
            matched = verification.is_matched(),
            "verification completed"
        );
        Ok(verification)
    }
}
