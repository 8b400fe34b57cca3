//! Health API endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::error::ServerError;
use crate::state::AppState;

/// Response for GET /api/health.
#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    /// Whether the document compiler can be launched.
    pandoc_available: bool,
}

/// Handle GET /api/health.
pub(crate) async fn get_health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ServerError> {
    let compiler = Arc::clone(state.converter.compiler());
    let pandoc_available = tokio::task::spawn_blocking(move || compiler.is_available()).await?;
    Ok(Json(HealthResponse {
        status: "ok",
        pandoc_available,
    }))
}
