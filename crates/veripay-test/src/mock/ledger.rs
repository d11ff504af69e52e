//! Scriptable mock usage ledger.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use veripay_core::{Error, Result, UsageLedger, UsageRecord};

use super::lock;

#[derive(Debug, Default)]
struct LedgerState {
    usage: AtomicU32,
    fail_usage: AtomicBool,
    fail_record: AtomicBool,
    records: Mutex<Vec<UsageRecord>>,
}

/// Mock [`UsageLedger`] with a settable count and failure switches.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    state: Arc<LedgerState>,
}

impl MockLedger {
    /// Creates a ledger reporting the given monthly usage.
    pub fn with_usage(usage: u32) -> Self {
        let ledger = Self::default();
        ledger.set_usage(usage);
        ledger
    }

    /// Sets the reported monthly usage.
    pub fn set_usage(&self, usage: u32) {
        self.state.usage.store(usage, Ordering::SeqCst);
    }

    /// Makes `usage_this_month` fail until switched back.
    pub fn fail_usage(&self, fail: bool) {
        self.state.fail_usage.store(fail, Ordering::SeqCst);
    }

    /// Makes `record` fail until switched back.
    pub fn fail_record(&self, fail: bool) {
        self.state.fail_record.store(fail, Ordering::SeqCst);
    }

    /// Rows written so far, in call order.
    pub fn records(&self) -> Vec<UsageRecord> {
        lock(&self.state.records).clone()
    }
}

#[async_trait::async_trait]
impl UsageLedger for MockLedger {
    async fn usage_this_month(&self) -> Result<u32> {
        if self.state.fail_usage.load(Ordering::SeqCst) {
            return Err(Error::collaborator().with_message("mock usage count unavailable"));
        }
        Ok(self.state.usage.load(Ordering::SeqCst))
    }

    async fn record(&self, record: UsageRecord) -> Result<()> {
        if self.state.fail_record.load(Ordering::SeqCst) {
            return Err(Error::collaborator().with_message("mock usage log unavailable"));
        }
        lock(&self.state.records).push(record);
        Ok(())
    }
}
