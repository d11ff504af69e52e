//! Mock implementations of the collaborator traits.
//!
//! Each mock plays back a scripted queue of outcomes and records what it
//! was called with, so tests can assert both behavior and interaction.

use std::sync::{Mutex, MutexGuard};

mod engine;
mod ledger;
mod verifier;

pub use engine::MockEngine;
pub use ledger::MockLedger;
pub use verifier::MockVerifier;

/// Locks mock state, recovering the guard if a test panicked while holding
/// it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
