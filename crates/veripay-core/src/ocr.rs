//! Recognition engine abstractions.
//!
//! Two engine variants implement [`OcrEngine`]: the serialized local engine
//! and the quota-gated cloud engine. The pipeline treats both uniformly and
//! feeds their output to the same identifier extractor.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Tracing target for recognition-engine operations.
pub const TRACING_TARGET: &str = "veripay_core::ocr";

/// Which engine variant produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// The long-lived, serially-invoked in-process engine.
    Local,
    /// The stateless, billed, remotely-hosted engine.
    Cloud,
}

/// Text recognized by a single engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recognition {
    /// Raw recognized text, before any identifier extraction.
    pub text: String,
    /// Self-assessed accuracy, 0 to 100. Absent for engines that do not
    /// report one.
    pub confidence: Option<f32>,
    /// Wall-clock duration of the invocation.
    pub duration: SignedDuration,
}

impl Recognition {
    /// Creates a new recognition result.
    pub fn new(text: impl Into<String>, confidence: Option<f32>, duration: SignedDuration) -> Self {
        Self {
            text: text.into(),
            confidence,
            duration,
        }
    }

    /// Whether the engine produced no usable text at all.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Record of one engine invocation, kept for logging and quota accounting.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionAttempt {
    /// Engine variant that ran.
    pub engine: EngineKind,
    /// Image the engine was given.
    pub source: PathBuf,
    /// Recognized text; empty when the attempt failed.
    pub text: String,
    /// Engine confidence, when reported.
    pub confidence: Option<f32>,
    /// Wall-clock duration of the attempt.
    pub duration: SignedDuration,
    /// Whether the engine returned a result at all.
    pub succeeded: bool,
    /// When the attempt started.
    pub started_at: Timestamp,
}

impl RecognitionAttempt {
    /// Records a successful invocation.
    pub fn succeeded(
        engine: EngineKind,
        source: impl Into<PathBuf>,
        recognition: &Recognition,
        started_at: Timestamp,
    ) -> Self {
        Self {
            engine,
            source: source.into(),
            text: recognition.text.clone(),
            confidence: recognition.confidence,
            duration: recognition.duration,
            succeeded: true,
            started_at,
        }
    }

    /// Records a failed invocation.
    pub fn failed(
        engine: EngineKind,
        source: impl Into<PathBuf>,
        duration: SignedDuration,
        started_at: Timestamp,
    ) -> Self {
        Self {
            engine,
            source: source.into(),
            text: String::new(),
            confidence: None,
            duration,
            succeeded: false,
            started_at,
        }
    }
}

/// Typed failures shared by both engine variants.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The image file was gone before the engine could read it.
    #[error("image not found: {}", path.display())]
    FileNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The engine has no usable credentials configured.
    #[error("engine credentials are not configured")]
    CredentialsMissing,

    /// The engine ran but detected no text in the image.
    #[error("no text detected in image")]
    NoText,

    /// The invocation exceeded its deadline.
    #[error("engine timed out after {timeout}")]
    Timeout {
        /// Configured deadline.
        timeout: SignedDuration,
    },

    /// The engine cannot run in this build or environment.
    #[error("engine unavailable: {reason}")]
    Unavailable {
        /// Human-readable cause.
        reason: Cow<'static, str>,
    },

    /// The engine (or its remote provider) reported an error.
    #[error("engine failure: {message}")]
    Provider {
        /// Provider-supplied or adapter-supplied description.
        message: String,
        /// Underlying error, when one exists.
        #[source]
        source: Option<crate::BoxedError>,
    },

    /// Reading the image from disk failed.
    #[error("image read failed")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates a provider error from a message alone.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a provider error wrapping an underlying cause.
    pub fn provider_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Provider {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the image itself (rather than the engine) is at fault.
    pub fn is_input_fault(&self) -> bool {
        matches!(self, Self::FileNotFound { .. } | Self::NoText)
    }
}

/// A recognition engine: give it an image path, get text and confidence.
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine identity used in logs and attempt records.
    fn kind(&self) -> EngineKind;

    /// Runs recognition against the image at `path`.
    async fn recognize(&self, path: &Path) -> Result<Recognition, EngineError>;

    /// Cheap readiness probe; engines with nothing to check report ready.
    async fn health_check(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_kind_serializes_snake_case() {
        assert_eq!(EngineKind::Local.as_ref(), "local");
        assert_eq!(EngineKind::Cloud.as_ref(), "cloud");
    }

    #[test]
    fn empty_recognition_is_flagged() {
        let r = Recognition::new("  \n ", Some(80.0), SignedDuration::from_millis(5));
        assert!(r.is_empty());

        let r = Recognition::new("B123", Some(80.0), SignedDuration::from_millis(5));
        assert!(!r.is_empty());
    }

    #[test]
    fn input_faults_are_distinguished() {
        assert!(EngineError::NoText.is_input_fault());
        assert!(
            EngineError::FileNotFound {
                path: PathBuf::from("/tmp/x.png")
            }
            .is_input_fault()
        );
        assert!(!EngineError::CredentialsMissing.is_input_fault());
        assert!(!EngineError::provider("boom").is_input_fault());
    }
}
