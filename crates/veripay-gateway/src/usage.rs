//! Usage accounting backed by the gateway's query endpoint.
//!
//! Billed-engine attempts live in one table reached through the generic
//! query envelope: a `COUNT(*)` over the current calendar month feeds the
//! quota guard, and every cloud attempt inserts exactly one row whether or
//! not it succeeded.

use jiff::Zoned;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use veripay_core::usage::month_window;
use veripay_core::{Error, Result, UsageLedger, UsageRecord};

use crate::client::GatewayClient;
use crate::{GatewayConfig, TRACING_TARGET};

/// Counts rows inserted during the given month window.
///
/// The count is aliased to the `TUID` column so it comes back through the
/// same envelope shape as every other gateway payload.
pub(crate) fn count_query(table: &str, window: (Date, Date)) -> String {
    let (start, end) = window;
    format!("SELECT COUNT(*) as TUID FROM {table} WHERE DT_IN >= '{start}' AND DT_IN < '{end}'")
}

/// Renders one attempt row. An attempt that never yielded an identifier
/// stores an empty `TUID`.
pub(crate) fn insert_statement(table: &str, record: &UsageRecord) -> String {
    let tuid = record.tuid.as_ref().map(|t| t.as_str()).unwrap_or("");
    let succeeded = if record.succeeded { "Y" } else { "N" };
    let recorded_at = record
        .recorded_at
        .to_zoned(TimeZone::system())
        .strftime("%Y-%m-%d %H:%M:%S");
    format!(
        "INSERT INTO {table} (TUID, ENGINE, SUCCESS, DT_IN) \
         VALUES ('{tuid}', '{engine}', '{succeeded}', '{recorded_at}')",
        engine = record.engine.as_ref(),
    )
}

fn usage_target(config: &GatewayConfig) -> Result<(&str, &str)> {
    let db = config
        .usage_db()
        .ok_or_else(|| Error::configuration().with_message("gateway usage db is not configured"))?;
    let table = config.usage_table().ok_or_else(|| {
        Error::configuration().with_message("gateway usage table is not configured")
    })?;
    Ok((db, table))
}

#[async_trait::async_trait]
impl UsageLedger for GatewayClient {
    async fn usage_this_month(&self) -> Result<u32> {
        let (db, table) = usage_target(self.config())?;
        let window = month_window(Zoned::now().date())?;

        let envelope = self.query(db, count_query(table, window)).await?;
        let count = envelope.first_count().ok_or_else(|| {
            Error::collaborator().with_message("usage count missing from gateway response")
        })?;

        tracing::debug!(
            target: TRACING_TARGET,
            count,
            window_start = %window.0,
            "fetched monthly usage count"
        );
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn record(&self, record: UsageRecord) -> Result<()> {
        let (db, table) = usage_target(self.config())?;

        self.query(db, insert_statement(table, &record)).await?;
        tracing::debug!(
            target: TRACING_TARGET,
            engine = record.engine.as_ref(),
            succeeded = record.succeeded,
            "recorded billed engine attempt"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use jiff::civil::date;
    use veripay_core::{EngineKind, ErrorKind, Tuid};

    use super::*;

    #[test]
    fn count_query_spans_the_month_window() {
        let window = (date(2024, 12, 1), date(2025, 1, 1));
        assert_eq!(
            count_query("usage_log", window),
            "SELECT COUNT(*) as TUID FROM usage_log \
             WHERE DT_IN >= '2024-12-01' AND DT_IN < '2025-01-01'"
        );
    }

    #[test]
    fn insert_statement_renders_one_attempt_row() {
        let record = UsageRecord {
            tuid: Some(Tuid::parse("B123456789012345").unwrap()),
            engine: EngineKind::Cloud,
            succeeded: true,
            recorded_at: Timestamp::UNIX_EPOCH,
        };

        let statement = insert_statement("usage_log", &record);
        assert!(statement.starts_with(
            "INSERT INTO usage_log (TUID, ENGINE, SUCCESS, DT_IN) \
             VALUES ('B123456789012345', 'cloud', 'Y', '"
        ));
        assert!(statement.ends_with("')"));
    }

    #[test]
    fn insert_statement_keeps_failed_attempts() {
        let record = UsageRecord {
            tuid: None,
            engine: EngineKind::Cloud,
            succeeded: false,
            recorded_at: Timestamp::UNIX_EPOCH,
        };

        let statement = insert_statement("usage_log", &record);
        assert!(statement.contains("VALUES ('', 'cloud', 'N', '"));
    }

    #[tokio::test]
    async fn unconfigured_usage_target_is_a_configuration_error() {
        let client = GatewayClient::new(GatewayConfig::default()).unwrap();

        let err = client.usage_this_month().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let record = UsageRecord::now(None, EngineKind::Cloud, false);
        let err = client.record(record).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
