//! Scriptable mock identifier verifier.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use veripay_core::{Error, Result, Tuid, TuidVerifier, Verification};

use super::lock;

#[derive(Debug, Default)]
struct VerifierState {
    script: Mutex<VecDeque<Result<Verification>>>,
    requests: Mutex<Vec<Tuid>>,
}

/// Mock [`TuidVerifier`] answering from a script, then a fixed fallback.
///
/// Clones share state. Without a fallback, a call past the end of the
/// script reports a collaborator failure.
#[derive(Debug, Clone)]
pub struct MockVerifier {
    fallback: Option<Verification>,
    state: Arc<VerifierState>,
}

impl MockVerifier {
    /// Creates a verifier that answers only from its script.
    pub fn scripted() -> Self {
        Self {
            fallback: None,
            state: Arc::default(),
        }
    }

    /// Creates a verifier that answers `verification` whenever the script
    /// is empty.
    pub fn always(verification: Verification) -> Self {
        Self {
            fallback: Some(verification),
            state: Arc::default(),
        }
    }

    /// Queues one verification outcome.
    pub fn push(&self, outcome: Result<Verification>) -> &Self {
        lock(&self.state.script).push_back(outcome);
        self
    }

    /// Identifiers the verifier was asked about, in call order.
    pub fn requests(&self) -> Vec<Tuid> {
        lock(&self.state.requests).clone()
    }

    /// Number of verify calls so far.
    pub fn calls(&self) -> usize {
        lock(&self.state.requests).len()
    }
}

#[async_trait::async_trait]
impl TuidVerifier for MockVerifier {
    async fn verify(&self, tuid: &Tuid) -> Result<Verification> {
        lock(&self.state.requests).push(tuid.clone());
        if let Some(outcome) = lock(&self.state.script).pop_front() {
            return outcome;
        }
        match self.fallback {
            Some(verification) => Ok(verification),
            None => Err(Error::collaborator().with_message("mock verifier script exhausted")),
        }
    }
}
