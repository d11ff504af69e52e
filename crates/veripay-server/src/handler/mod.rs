//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod recognize;
mod response;
mod upload;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;

pub use crate::handler::response::Envelope;
use crate::middleware::{
    CorsConfig, DEFAULT_MAX_BODY_SIZE, create_body_limit_layer, create_cors_layer,
    create_permissive_cors_layer,
};
use crate::state::AppState;

#[inline]
async fn handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Returns a [`Router`] with every route and its route-level policy.
///
/// The upload route answers only allow-listed origins and caps request
/// bodies; the recognition route accepts any origin. axum's default body
/// limit is disabled, the tower-http layer enforces the cap.
pub fn routes(cors: &CorsConfig) -> Router<AppState> {
    let upload_routes = upload::routes()
        .layer(create_cors_layer(cors))
        .layer(DefaultBodyLimit::disable())
        .layer(create_body_limit_layer(DEFAULT_MAX_BODY_SIZE));

    let recognize_routes = recognize::routes().layer(create_permissive_cors_layer());

    Router::new()
        .merge(upload_routes)
        .merge(recognize_routes)
        .fallback(handler)
}
