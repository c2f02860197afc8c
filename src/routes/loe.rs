//! LoE endpoints
//!
//! Schema extraction from notes and document generation from a schema.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use crate::app::AppState;
use crate::domain::{GenerateRequest, GeneratedDocument, IngestRequest, IngestResponse};
use crate::error::{ApiError, ApiResult};

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(req)| req)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Extract a canonical project schema from free-text notes.
///
/// POST /ingest
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> ApiResult<Json<IngestResponse>> {
    let req = body(payload)?;
    let text = req.text.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Missing 'text'".to_string()));
    }

    let schema = state
        .orchestrator()
        .ingest(text, req.loe_type.as_deref())
        .await?;

    Ok(Json(IngestResponse { schema }))
}

/// Generate the LoE document for a schema.
///
/// POST /generate
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<GeneratedDocument>> {
    let req = body(payload)?;
    let document = state
        .orchestrator()
        .generate(&req.schema, req.loe_type.as_deref())
        .await?;

    Ok(Json(document))
}
