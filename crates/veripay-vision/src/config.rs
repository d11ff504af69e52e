use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the Vision REST client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(clap::Args))]
pub struct VisionConfig {
    /// Base endpoint of the annotate API.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "vision-endpoint",
            env = "VERIPAY_VISION_ENDPOINT",
            default_value = "https://vision.googleapis.com/v1"
        )
    )]
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key sent with every annotate request.
    ///
    /// Recognition through the cloud engine fails with a credentials error
    /// when unset; the rest of the service runs normally.
    #[cfg_attr(
        feature = "config",
        arg(long = "vision-api-key", env = "VERIPAY_VISION_API_KEY")
    )]
    #[serde(default)]
    pub api_key: Option<String>,

    /// Seconds allowed for one annotate round trip.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "vision-timeout",
            env = "VERIPAY_VISION_TIMEOUT_SECS",
            default_value_t = default_timeout_secs()
        )
    )]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Seconds allowed for establishing the connection.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "vision-connect-timeout",
            env = "VERIPAY_VISION_CONNECT_TIMEOUT_SECS",
            default_value_t = default_connect_timeout_secs()
        )
    )]
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl VisionConfig {
    /// Round-trip deadline for one annotate request.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connection-establishment deadline.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// The configured API key, treating an empty string as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "https://vision.googleapis.com/v1".to_owned()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}
