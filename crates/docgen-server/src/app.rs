//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::headers;
use crate::state::AppState;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `max_upload_bytes` - Request body limit
pub(crate) fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::get_health))
        .route("/api/templates", get(handlers::templates::get_templates))
        .route("/api/convert", post(handlers::convert::post_convert))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(headers::content_type_options_layer())
                .layer(headers::no_store_layer()),
        )
        .with_state(state)
}
