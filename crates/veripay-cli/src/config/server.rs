//! HTTP server configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Result as AnyhowResult, anyhow};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Network binding and lifecycle timeouts for the HTTP server.
///
/// Every field can come from a flag or an environment variable: `HOST`,
/// `PORT`, `REQUEST_TIMEOUT` and `SHUTDOWN_TIMEOUT` (timeouts in seconds).
///
/// ```bash
/// veripay --host 0.0.0.0 --port 8080
/// HOST=0.0.0.0 PORT=8080 veripay
/// ```
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ServerConfig {
    /// Host address to bind to.
    ///
    /// "127.0.0.1" for localhost only, "0.0.0.0" for all interfaces.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// TCP port to listen on, in the unprivileged range 1024-65535.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 8080)]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds a request may take end to end before it answers 408.
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 30)]
    #[serde(default = "default_timeout")]
    pub request_timeout: u64,

    /// Seconds to wait for in-flight requests once shutdown begins.
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 30)]
    #[serde(default = "default_timeout")]
    pub shutdown_timeout: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    8080
}

fn default_timeout() -> u64 {
    30
}

impl ServerConfig {
    /// Checks every value against its valid range.
    ///
    /// # Errors
    ///
    /// Returns an error for a privileged port or a timeout outside
    /// 1-300 seconds.
    pub fn validate(&self) -> AnyhowResult<()> {
        if self.port < 1024 {
            return Err(anyhow!(
                "port {} requires root privileges, use 1024-65535",
                self.port
            ));
        }

        if self.request_timeout == 0 || self.request_timeout > 300 {
            return Err(anyhow!(
                "request timeout {}s is outside the valid range of 1-300 seconds",
                self.request_timeout
            ));
        }

        if self.shutdown_timeout == 0 || self.shutdown_timeout > 300 {
            return Err(anyhow!(
                "shutdown timeout {}s is outside the valid range of 1-300 seconds",
                self.shutdown_timeout
            ));
        }

        Ok(())
    }

    /// Returns the socket address to bind.
    #[must_use]
    pub const fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns the request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Returns the graceful shutdown timeout as a [`Duration`].
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    /// Whether the server binds every interface ("0.0.0.0" or "::").
    #[must_use]
    pub const fn binds_to_all_interfaces(&self) -> bool {
        match self.host {
            IpAddr::V4(addr) => addr.is_unspecified(),
            IpAddr::V6(addr) => addr.is_unspecified(),
        }
    }

    /// Whether this looks like a development setup (loopback, default port).
    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self.host, IpAddr::V4(addr) if addr.is_loopback()) && self.port == default_port()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_timeout(),
            shutdown_timeout: default_timeout(),
        }
    }
}

/// Logs server configuration details at startup.
pub fn log_server_config(config: &ServerConfig) {
    tracing::info!(
        target: TRACING_TARGET_CONFIG,
        host = %config.host,
        port = config.port,
        request_timeout_secs = config.request_timeout,
        shutdown_timeout_secs = config.shutdown_timeout,
        development_mode = config.is_development(),
        "server configured"
    );
}
