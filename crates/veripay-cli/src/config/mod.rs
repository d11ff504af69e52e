//! CLI configuration management.
//!
//! The complete configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── server: ServerConfig    # Host, port, lifecycle timeouts
//! ├── cors: CorsConfig        # Origin allow-list for the upload route
//! └── service: ServiceConfig  # Upload store, OCR engines, gateway
//! ```
//!
//! All configuration can be provided via CLI arguments or environment
//! variables. Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! # Configure the bind address and the ledger gateway
//! veripay --port 8080 --gateway-query-url "https://gateway.example/transactions"
//!
//! # Or via environment variables
//! PORT=8080 VERIPAY_GATEWAY_QUERY_URL="https://gateway.example/transactions" veripay
//! ```

mod server;

use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use veripay_server::ServiceConfig;
use veripay_server::middleware::CorsConfig;

pub use self::server::ServerConfig;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
///
/// Combines every configuration group for the veripay server:
/// - [`ServerConfig`]: network binding and lifecycle timeouts
/// - [`CorsConfig`]: origin allow-list for the upload route
/// - [`ServiceConfig`]: upload store, recognition engines and gateway
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "veripay")]
#[command(about = "Receipt verification server")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// CORS policy for the upload route.
    #[clap(flatten)]
    pub cors: CorsConfig,

    /// Upload store, recognition engine and gateway configuration.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Maintenance command to run instead of serving.
    #[command(subcommand)]
    #[serde(skip)]
    pub command: Option<Command>,
}

/// Maintenance commands that run without starting the server.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Inspects or cleans the chunk scratch store.
    Scratch {
        #[command(subcommand)]
        command: ScratchCommand,
    },
}

/// Operations on the chunk scratch store.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ScratchCommand {
    /// Prints every live session and orphaned scratch entry as JSON.
    Status,
    /// Removes scratch directories no live session accounts for.
    Sweep,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// This is the preferred way to initialize the CLI configuration as it ensures
    /// .env files are loaded before clap parses arguments, allowing environment
    /// variables from .env to be used as defaults.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    ///
    /// This should be called before parsing CLI arguments so that clap's `env`
    /// feature can pick up values from .env files.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Logs build information at debug level.
    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "build information"
        );
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        Ok(())
    }

    /// Logs configuration at startup (no sensitive information).
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            "starting veripay server"
        );

        Self::log_build_info();
        server::log_server_config(&self.server);
        self.log_service_config();
    }

    /// Logs the service configuration groups.
    fn log_service_config(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            cors_origins = ?self.cors.allowed_origins,
            cors_credentials = self.cors.allow_credentials,
            scratch_dir = %self.service.upload.scratch_dir.display(),
            artifact_dir = %self.service.upload.artifact_dir.display(),
            session_ttl_secs = self.service.upload.session_ttl_secs,
            monthly_ceiling = self.service.pipeline.monthly_ceiling,
            "service configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [
            cfg!(feature = "dotenv").then_some("dotenv"),
            cfg!(feature = "tesseract").then_some("tesseract"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
