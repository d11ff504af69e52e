//! Tower middleware for the HTTP surface.
//!
//! The upload route runs behind an origin allow-list and a body size limit;
//! the recognition route behind a permissive CORS policy. The trace layer is
//! applied by the binary around the assembled router.

mod body_limit;
mod cors;
mod trace;

pub use crate::middleware::body_limit::{DEFAULT_MAX_BODY_SIZE, create_body_limit_layer};
pub use crate::middleware::cors::{CorsConfig, create_cors_layer, create_permissive_cors_layer};
pub use crate::middleware::trace::create_trace_layer;
