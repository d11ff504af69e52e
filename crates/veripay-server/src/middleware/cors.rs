//! CORS (Cross-Origin Resource Sharing) middleware configuration.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method, header};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

/// Creates the allow-list CORS layer guarding the upload route.
///
/// Origins come from the configuration; methods and headers are fixed to
/// what the upload client sends.
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = config.to_header_values();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-access-token"),
            header::AUTHORIZATION,
        ])
        .allow_credentials(config.allow_credentials)
        .max_age(config.max_age())
}

/// Creates the permissive CORS layer for the recognition route.
///
/// Any origin, no credentials. Wildcard origins cannot be combined with
/// credentials, so this layer takes no configuration.
pub fn create_permissive_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// CORS configuration for the upload route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(clap::Args))]
#[must_use = "config does nothing unless you use it"]
pub struct CorsConfig {
    /// Origins allowed to call the upload route.
    /// If empty, defaults to localhost origins for development.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "cors-origins",
            env = "VERIPAY_CORS_ORIGINS",
            value_delimiter = ','
        )
    )]
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Maximum age for CORS preflight requests in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "cors-max-age",
            env = "VERIPAY_CORS_MAX_AGE",
            default_value_t = default_max_age_seconds()
        )
    )]
    #[serde(default = "default_max_age_seconds")]
    pub max_age_seconds: u64,

    /// Whether to allow credentials in CORS requests.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "cors-allow-credentials",
            env = "VERIPAY_CORS_ALLOW_CREDENTIALS",
            default_value_t = default_allow_credentials()
        )
    )]
    #[serde(default = "default_allow_credentials")]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_seconds: default_max_age_seconds(),
            allow_credentials: default_allow_credentials(),
        }
    }
}

impl CorsConfig {
    /// Returns the CORS max age as a Duration.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_seconds)
    }

    /// Returns localhost origins for development.
    pub fn get_localhost_origins() -> Vec<HeaderValue> {
        vec![
            "http://localhost:3000".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
            "http://localhost:5173".parse().unwrap(), // Vite default
        ]
    }

    /// Converts configured origins to HeaderValue list.
    ///
    /// Origins that do not parse as header values are dropped.
    pub fn to_header_values(&self) -> Vec<HeaderValue> {
        if self.allowed_origins.is_empty() {
            Self::get_localhost_origins()
        } else {
            self.allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect()
        }
    }
}

fn default_max_age_seconds() -> u64 {
    3600
}

fn default_allow_credentials() -> bool {
    true
}
