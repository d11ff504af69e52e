//! Engine adapter over the Vision client.

use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use std::time::Instant;

use jiff::SignedDuration;
use veripay_core::{EngineError, EngineKind, OcrEngine, Recognition};

use crate::{TRACING_TARGET_ENGINE, VisionClient};

/// The cloud recognition engine.
///
/// Reads the original artifact bytes from disk and hands them to the
/// annotate endpoint. Vision reports no usable confidence for full-text
/// detection, so `confidence` is always absent.
#[derive(Debug, Clone)]
pub struct CloudEngine {
    client: VisionClient,
}

impl CloudEngine {
    /// Creates an engine over an existing client.
    pub fn new(client: VisionClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &VisionClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl OcrEngine for CloudEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Cloud
    }

    async fn recognize(&self, path: &Path) -> Result<Recognition, EngineError> {
        let image = tokio::fs::read(path).await.map_err(|err| {
            if err.kind() == IoErrorKind::NotFound {
                EngineError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                EngineError::Io(err)
            }
        })?;

        let started = Instant::now();
        let text = self.client.detect_text(&image).await?;
        let duration = SignedDuration::try_from(started.elapsed()).unwrap_or(SignedDuration::MAX);

        tracing::debug!(
            target: TRACING_TARGET_ENGINE,
            path = %path.display(),
            text_len = text.len(),
            "cloud recognition finished"
        );
        Ok(Recognition::new(text, None, duration))
    }

    async fn health_check(&self) -> Result<(), EngineError> {
        self.client.health_check()
    }
}
