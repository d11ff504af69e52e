//! Monthly ceiling gate in front of the billed cloud engine.

use std::fmt;
use std::sync::Arc;

use veripay_core::{Error, Result, UsageLedger};

use crate::TRACING_TARGET;

/// Gates cloud escalation behind the calendar month's billed usage.
///
/// The two ways past the gate can fail stay distinct: a ledger that cannot
/// produce a count keeps its own error kind, while a count at or above the
/// ceiling becomes a quota failure.
pub struct QuotaGuard {
    ledger: Arc<dyn UsageLedger>,
    ceiling: u32,
}

impl QuotaGuard {
    /// Creates a guard over `ledger` with the given monthly ceiling.
    pub fn new(ledger: Arc<dyn UsageLedger>, ceiling: u32) -> Self {
        Self { ledger, ceiling }
    }

    /// Returns the month's usage when it is still below the ceiling.
    pub async fn ensure_below_ceiling(&self) -> Result<u32> {
        let usage = self.ledger.usage_this_month().await?;
        if usage >= self.ceiling {
            tracing::warn!(
                target: TRACING_TARGET,
                usage,
                ceiling = self.ceiling,
                "monthly cloud recognition ceiling reached"
            );
            return Err(Error::quota_exceeded().with_message(format!(
                "monthly cloud usage {usage} has reached the ceiling of {}",
                self.ceiling
            )));
        }
        Ok(usage)
    }
}

impl fmt::Debug for QuotaGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotaGuard")
            .field("ceiling", &self.ceiling)
            .finish_non_exhaustive()
    }
}
