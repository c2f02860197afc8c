use axum::{extract::State, Json};
use std::sync::Arc;

use crate::app::AppState;
use crate::domain::HealthResponse;

/// Health check endpoint - reports which generator backs the service
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        mode: state.generator.mode().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
