//! Templates API endpoint.
//!
//! Lists the reference documents available for conversion.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use docgen_convert::TemplateInfo;
use serde::Serialize;

use crate::error::ServerError;
use crate::state::AppState;

/// Template entry for serialization.
#[derive(Serialize)]
pub(crate) struct TemplateResponse {
    /// File name, accepted as the `template` form field.
    name: String,
    path: String,
}

impl From<TemplateInfo> for TemplateResponse {
    fn from(info: TemplateInfo) -> Self {
        Self {
            name: info.name,
            path: info.path.display().to_string(),
        }
    }
}

/// Handle GET /api/templates.
pub(crate) async fn get_templates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TemplateResponse>>, ServerError> {
    let Some(store) = state.templates() else {
        return Ok(Json(Vec::new()));
    };
    let templates = store.list()?;
    Ok(Json(templates.into_iter().map(TemplateResponse::from).collect()))
}
