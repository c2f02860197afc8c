//! Generated document and the request/response DTOs of the HTTP surface.

use serde::{Deserialize, Serialize};

use super::schema::ProjectSchema;

/// Final (or draft) LoE deliverable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub summary: String,
    pub tasks: String,
    pub open_questions: Vec<String>,
}

// =============================================================================
// Request/Response DTOs for API endpoints
// =============================================================================

/// Request for schema extraction from free-text notes.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub loe_type: Option<String>,
}

/// Response for schema extraction.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub schema: ProjectSchema,
}

/// Request for document generation. The schema is taken as raw JSON and
/// re-normalized, since clients edit it between the two calls.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub schema: serde_json::Value,
    #[serde(default)]
    pub loe_type: Option<String>,
}

/// Health probe payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub mode: String,
    pub version: String,
}
