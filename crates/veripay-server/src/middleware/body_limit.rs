//! Request body size limiting middleware.

use tower_http::limit::RequestBodyLimitLayer;

/// Maximum request body size for chunk uploads: 16MB.
///
/// Individual chunks are around a megabyte; the ceiling only has to cover
/// one chunk plus its multipart framing, never a whole upload.
pub const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Creates a request body size limit layer with a custom size.
pub fn create_body_limit_layer(max_size: usize) -> RequestBodyLimitLayer {
    RequestBodyLimitLayer::new(max_size)
}
