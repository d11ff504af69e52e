//! Identifier verification against the transaction system of record.

use serde::Serialize;

use crate::Result;
use crate::tuid::Tuid;

/// Outcome of checking a recognized identifier against issued transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// The identifier corresponds to a known transaction.
    Matched,
    /// The lookup completed and found nothing.
    NotMatched,
}

impl Verification {
    /// Whether the identifier was found.
    pub fn is_matched(self) -> bool {
        matches!(self, Self::Matched)
    }
}

/// Looks up recognized identifiers in the system of record.
///
/// A transport or collaborator failure is an `Err`, never `NotMatched`:
/// callers that gate expensive work on verification must be able to tell
/// "the identifier is wrong" apart from "the check could not run".
#[async_trait::async_trait]
pub trait TuidVerifier: Send + Sync {
    /// Checks whether `tuid` names an issued transaction.
    async fn verify(&self, tuid: &Tuid) -> Result<Verification>;
}
