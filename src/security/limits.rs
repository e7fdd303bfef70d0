//! Request body limits.
//!
//! Bodies over `security.max_body_size` are answered with
//! 413 Payload Too Large before any handler runs. axum's own per-extractor
//! default is disabled so the configured limit is the only one.

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// Wrap `router` with a body size limit of `max_body_size` bytes.
pub fn with_body_limit(router: Router, max_body_size: usize) -> Router {
    router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_size))
}
