//! Billed-engine usage accounting.
//!
//! Cloud recognition is metered per calendar month. The ledger trait is the
//! seam between the pipeline's quota guard and whatever stores the counts.

use jiff::civil::Date;
use jiff::{Span, Timestamp};
use serde::Serialize;

use crate::ocr::EngineKind;
use crate::tuid::Tuid;
use crate::{Error, Result};

/// One billed-engine invocation, as persisted for quota accounting.
#[derive(Debug, Clone, Serialize)]
pub struct UsageRecord {
    /// Identifier the invocation recognized, when one was found.
    pub tuid: Option<Tuid>,
    /// Engine variant that was billed.
    pub engine: EngineKind,
    /// Whether the invocation yielded usable text.
    pub succeeded: bool,
    /// When the invocation was recorded.
    pub recorded_at: Timestamp,
}

impl UsageRecord {
    /// Creates a record stamped with the current time.
    pub fn now(tuid: Option<Tuid>, engine: EngineKind, succeeded: bool) -> Self {
        Self {
            tuid,
            engine,
            succeeded,
            recorded_at: Timestamp::now(),
        }
    }
}

/// Stores and counts billed-engine invocations.
#[async_trait::async_trait]
pub trait UsageLedger: Send + Sync {
    /// Number of billed invocations recorded in the current calendar month.
    async fn usage_this_month(&self) -> Result<u32>;

    /// Persists one billed invocation.
    ///
    /// Failures here are surfaced to the caller: a billed call that cannot
    /// be accounted for must not look like a success.
    async fn record(&self, record: UsageRecord) -> Result<()>;
}

/// Half-open calendar-month window `[start, end)` containing `today`.
///
/// `end` is the first day of the following month, so a December window
/// rolls over into January of the next year.
pub fn month_window(today: Date) -> Result<(Date, Date)> {
    let start = today.first_of_month();
    let end = start
        .checked_add(Span::new().months(1))
        .map_err(|err| {
            Error::unknown()
                .with_message("month window overflowed")
                .with_source(err)
        })?;
    Ok((start, end))
}
