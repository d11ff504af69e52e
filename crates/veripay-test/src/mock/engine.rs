//! Scriptable mock recognition engine.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use jiff::SignedDuration;
use veripay_core::{EngineError, EngineKind, OcrEngine, Recognition};

use super::lock;

#[derive(Debug, Default)]
struct EngineState {
    script: Mutex<VecDeque<Result<Recognition, EngineError>>>,
    seen: Mutex<Vec<PathBuf>>,
}

/// Mock [`OcrEngine`] that plays back scripted outcomes in order.
///
/// Clones share state. When the script runs dry the engine reports a
/// provider failure, so an unexpected extra call fails the test instead of
/// silently succeeding.
#[derive(Debug, Clone)]
pub struct MockEngine {
    kind: EngineKind,
    state: Arc<EngineState>,
}

impl MockEngine {
    /// Creates an engine reporting the given kind, with an empty script.
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            state: Arc::new(EngineState::default()),
        }
    }

    /// Creates a local-engine mock.
    pub fn local() -> Self {
        Self::new(EngineKind::Local)
    }

    /// Creates a cloud-engine mock.
    pub fn cloud() -> Self {
        Self::new(EngineKind::Cloud)
    }

    /// Queues a successful recognition of `text`.
    pub fn push_text(&self, text: impl Into<String>) -> &Self {
        self.push(Ok(Recognition::new(text, None, SignedDuration::ZERO)))
    }

    /// Queues an arbitrary outcome.
    pub fn push(&self, outcome: Result<Recognition, EngineError>) -> &Self {
        lock(&self.state.script).push_back(outcome);
        self
    }

    /// Paths the engine was asked to recognize, in call order.
    pub fn seen(&self) -> Vec<PathBuf> {
        lock(&self.state.seen).clone()
    }

    /// Number of recognize calls so far.
    pub fn calls(&self) -> usize {
        lock(&self.state.seen).len()
    }
}

#[async_trait::async_trait]
impl OcrEngine for MockEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    async fn recognize(&self, path: &Path) -> Result<Recognition, EngineError> {
        lock(&self.state.seen).push(path.to_path_buf());
        lock(&self.state.script)
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::provider("mock engine script exhausted")))
    }
}
