//! Recognition orchestration from reassembled artifact to verified TUID.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use veripay_core::tuid::extract;
use veripay_core::{
    EngineError, EngineKind, Error, OcrEngine, Recognition, RecognitionAttempt, Result, Tuid,
    TuidVerifier, UsageLedger, UsageRecord, Verification,
};
use veripay_imaging::{
    Prepared, apply_adjustment, assess_orientation, prepare_fast, prepare_thorough,
};

use crate::TRACING_TARGET;
use crate::config::PipelineConfig;
use crate::quota::QuotaGuard;
use crate::scratch::ScratchGuard;

/// Outcome of a recognition run whose identifier verified.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionReport {
    /// The verified identifier.
    pub tuid: Tuid,
    /// Engine whose output verified.
    pub engine: EngineKind,
    /// Whether recognition read a rotated derivative.
    pub was_rotated: bool,
    /// Every engine invocation made during the run, in order.
    pub attempts: Vec<RecognitionAttempt>,
    /// Wall-clock duration of the whole run.
    pub elapsed: SignedDuration,
}

/// Drives one receipt photo from artifact to verified identifier.
///
/// The run is a fixed escalation: best-effort orientation and
/// preprocessing, the local engine, candidate extraction, independent
/// verification, and only when a local candidate fails verification the
/// quota-gated billed cloud engine over the original artifact. Heuristic
/// failures degrade the image pipeline; engine, verifier, and ledger
/// failures end the run. Scratch created along the way is removed on every
/// terminal path, success included.
pub struct RecognitionPipeline {
    config: PipelineConfig,
    local: Arc<dyn OcrEngine>,
    cloud: Arc<dyn OcrEngine>,
    verifier: Arc<dyn TuidVerifier>,
    ledger: Arc<dyn UsageLedger>,
    quota: QuotaGuard,
}

impl RecognitionPipeline {
    /// Wires the pipeline from its collaborators.
    pub fn new(
        config: PipelineConfig,
        local: Arc<dyn OcrEngine>,
        cloud: Arc<dyn OcrEngine>,
        verifier: Arc<dyn TuidVerifier>,
        ledger: Arc<dyn UsageLedger>,
    ) -> Self {
        let quota = QuotaGuard::new(ledger.clone(), config.monthly_ceiling);
        Self {
            config,
            local,
            cloud,
            verifier,
            ledger,
            quota,
        }
    }

    /// Runs the full recognition flow over a reassembled artifact.
    ///
    /// Whatever the outcome, the artifact and every derivative created
    /// during the run are gone by the time this returns.
    pub async fn recognize(&self, artifact: &Path) -> Result<RecognitionReport> {
        let started = Instant::now();

        if !tokio::fs::try_exists(artifact).await.unwrap_or(false) {
            return Err(Error::invalid_input()
                .with_message(format!("image not found: {}", artifact.display())));
        }

        let mut scratch = ScratchGuard::new(artifact);
        let result = self.run(artifact, &mut scratch).await;
        scratch.cleanup().await;

        let elapsed = elapsed_since(started);
        match result {
            Ok(report) => {
                let report = RecognitionReport { elapsed, ..report };
                tracing::info!(
                    target: TRACING_TARGET,
                    tuid = %report.tuid,
                    engine = report.engine.as_ref(),
                    was_rotated = report.was_rotated,
                    attempts = report.attempts.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "recognition verified"
                );
                Ok(report)
            }
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    kind = err.kind_str(),
                    error = %err,
                    elapsed_ms = elapsed.as_millis(),
                    "recognition failed"
                );
                Err(err)
            }
        }
    }

    async fn run(&self, artifact: &Path, scratch: &mut ScratchGuard) -> Result<RecognitionReport> {
        let (working, was_rotated) = self.orient(artifact, scratch).await;
        let prepared = self.prepare(&working).await;
        if prepared.is_derived() {
            scratch.register(&prepared.path);
        }

        let mut attempts = Vec::new();

        let (local_result, attempt) = self.attempt(self.local.as_ref(), &prepared.path).await;
        attempts.push(attempt);
        let recognition = local_result.map_err(|err| {
            Error::engine()
                .with_message("local recognition failed")
                .with_source(err)
        })?;

        let Some(candidate) = extract(&recognition.text) else {
            return Err(Error::ambiguous()
                .with_message("no identifier candidate in the recognized text"));
        };

        if self.verifier.verify(&candidate).await?.is_matched() {
            return Ok(RecognitionReport {
                tuid: candidate,
                engine: EngineKind::Local,
                was_rotated,
                attempts,
                elapsed: SignedDuration::ZERO,
            });
        }

        tracing::debug!(
            target: TRACING_TARGET,
            candidate = %candidate,
            "local candidate did not verify, escalating to the cloud engine"
        );
        let usage = self.quota.ensure_below_ceiling().await?;
        tracing::debug!(target: TRACING_TARGET, usage, "cloud quota check passed");

        // The billed fallback reads the original artifact, not a
        // derivative tuned for the local engine.
        let (cloud_result, attempt) = self.attempt(self.cloud.as_ref(), artifact).await;
        attempts.push(attempt);

        let cloud_candidate = cloud_result
            .as_ref()
            .ok()
            .and_then(|recognition| extract(&recognition.text));
        self.ledger
            .record(UsageRecord::now(
                cloud_candidate.clone(),
                EngineKind::Cloud,
                cloud_result.is_ok(),
            ))
            .await?;

        if let Err(err) = cloud_result {
            return Err(Error::collaborator()
                .with_message("cloud recognition failed")
                .with_source(err));
        }
        let Some(tuid) = cloud_candidate else {
            return Err(Error::ambiguous()
                .with_message("no identifier candidate in the recognized text"));
        };

        match self.verifier.verify(&tuid).await? {
            Verification::Matched => Ok(RecognitionReport {
                tuid,
                engine: EngineKind::Cloud,
                was_rotated,
                attempts,
                elapsed: SignedDuration::ZERO,
            }),
            Verification::NotMatched => Err(Error::unverified().with_message(format!(
                "identifier {tuid} does not match an issued transaction"
            ))),
        }
    }

    /// Best-effort rotation. Returns the image recognition should read and
    /// whether it is a rotated derivative.
    async fn orient(&self, artifact: &Path, scratch: &mut ScratchGuard) -> (PathBuf, bool) {
        let path = artifact.to_path_buf();
        let orientation =
            match tokio::task::spawn_blocking(move || assess_orientation(&path)).await {
                Ok(orientation) => orientation,
                Err(err) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        error = %err,
                        "orientation analysis did not finish, treating the image as upright"
                    );
                    return (artifact.to_path_buf(), false);
                }
            };
        let Some(adjustment) = orientation.adjustment() else {
            return (artifact.to_path_buf(), false);
        };

        let path = artifact.to_path_buf();
        let rotated =
            match tokio::task::spawn_blocking(move || apply_adjustment(&path, adjustment)).await {
                Ok(rotated) => rotated,
                Err(err) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        error = %err,
                        "rotation did not finish, keeping the original image"
                    );
                    None
                }
            };
        match rotated {
            Some(derived) => {
                scratch.register(&derived);
                (derived, true)
            }
            None => (artifact.to_path_buf(), false),
        }
    }

    /// Best-effort preprocessing with the configured profile.
    async fn prepare(&self, source: &Path) -> Prepared {
        let thorough = self.config.thorough;
        let path = source.to_path_buf();
        let prepared = tokio::task::spawn_blocking(move || {
            if thorough {
                prepare_thorough(&path)
            } else {
                prepare_fast(&path)
            }
        })
        .await;

        match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %err,
                    "preprocessing did not finish, using the source image"
                );
                Prepared::unmodified(source)
            }
        }
    }

    /// Runs one engine and records the invocation for the report.
    async fn attempt(
        &self,
        engine: &dyn OcrEngine,
        image: &Path,
    ) -> (Result<Recognition, EngineError>, RecognitionAttempt) {
        let started_at = Timestamp::now();
        let started = Instant::now();
        let result = engine.recognize(image).await;

        let attempt = match &result {
            Ok(recognition) => {
                RecognitionAttempt::succeeded(engine.kind(), image, recognition, started_at)
            }
            Err(_) => {
                RecognitionAttempt::failed(engine.kind(), image, elapsed_since(started), started_at)
            }
        };
        tracing::debug!(
            target: TRACING_TARGET,
            engine = attempt.engine.as_ref(),
            succeeded = attempt.succeeded,
            duration_ms = attempt.duration.as_millis(),
            "recognition attempt finished"
        );
        (result, attempt)
    }
}

impl fmt::Debug for RecognitionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn elapsed_since(started: Instant) -> SignedDuration {
    SignedDuration::try_from(started.elapsed()).unwrap_or(SignedDuration::MAX)
}
