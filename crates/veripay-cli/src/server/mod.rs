//! HTTP server startup and lifecycle management.
//!
//! Binds the listener, serves the router and coordinates graceful
//! shutdown on SIGINT/SIGTERM.

mod error;
mod http_server;
mod shutdown;

use axum::Router;

pub use self::error::{ServerError, ServerResult};
use crate::config::ServerConfig;

/// Serves the router until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if:
/// - Server configuration is invalid
/// - Cannot bind to the specified address/port
/// - Server encounters a fatal error during operation
pub async fn serve(app: Router, config: ServerConfig) -> ServerResult<()> {
    http_server::serve_http(app, config).await
}
