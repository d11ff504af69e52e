use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the common API gateway client.
///
/// Every setting except the timeouts is optional: the service boots without
/// them, and only the calls that need a missing one fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(clap::Args))]
pub struct GatewayConfig {
    /// Endpoint accepting generic query envelopes.
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-query-url", env = "VERIPAY_GATEWAY_QUERY_URL")
    )]
    #[serde(default)]
    pub query_url: Option<String>,

    /// Endpoint accepting identifier-verification requests.
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-verify-url", env = "VERIPAY_GATEWAY_VERIFY_URL")
    )]
    #[serde(default)]
    pub verify_url: Option<String>,

    /// API key sent with every gateway request.
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-api-key", env = "VERIPAY_GATEWAY_API_KEY")
    )]
    #[serde(default)]
    pub api_key: Option<String>,

    /// Shared secret keying the body signature.
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-secret", env = "VERIPAY_GATEWAY_SECRET")
    )]
    #[serde(default)]
    pub secret: Option<String>,

    /// Database key the usage log lives under.
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-usage-db", env = "VERIPAY_GATEWAY_USAGE_DB")
    )]
    #[serde(default)]
    pub usage_db: Option<String>,

    /// Table receiving one row per cloud-engine attempt.
    #[cfg_attr(
        feature = "config",
        arg(long = "gateway-usage-table", env = "VERIPAY_GATEWAY_USAGE_TABLE")
    )]
    #[serde(default)]
    pub usage_table: Option<String>,

    /// Seconds allowed for one gateway round trip.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "gateway-timeout",
            env = "VERIPAY_GATEWAY_TIMEOUT_SECS",
            default_value_t = default_timeout_secs()
        )
    )]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Seconds allowed for establishing the connection.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "gateway-connect-timeout",
            env = "VERIPAY_GATEWAY_CONNECT_TIMEOUT_SECS",
            default_value_t = default_connect_timeout_secs()
        )
    )]
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl GatewayConfig {
    /// Round-trip deadline for one gateway request.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connection-establishment deadline.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// The configured API key, treating an empty string as absent.
    pub fn api_key(&self) -> Option<&str> {
        non_empty(self.api_key.as_deref())
    }

    /// The configured signing secret, treating an empty string as absent.
    pub fn secret(&self) -> Option<&str> {
        non_empty(self.secret.as_deref())
    }

    /// The configured usage database key.
    pub fn usage_db(&self) -> Option<&str> {
        non_empty(self.usage_db.as_deref())
    }

    /// The configured usage table name.
    pub fn usage_table(&self) -> Option<&str> {
        non_empty(self.usage_table.as_deref())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            query_url: None,
            verify_url: None,
            api_key: None,
            secret: None,
            usage_db: None,
            usage_table: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_the_gateway_unconfigured() {
        let config = GatewayConfig::default();
        assert_eq!(config.query_url, None);
        assert_eq!(config.verify_url, None);
        assert_eq!(config.api_key(), None);
        assert_eq!(config.secret(), None);
    }

    #[test]
    fn blank_strings_count_as_absent() {
        let config = GatewayConfig {
            api_key: Some(String::new()),
            secret: Some("s".to_owned()),
            ..GatewayConfig::default()
        };
        assert_eq!(config.api_key(), None);
        assert_eq!(config.secret(), Some("s"));
    }

    #[test]
    fn deserializes_with_defaults_for_missing_fields() {
        let config: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }
}
