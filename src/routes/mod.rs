pub mod health;
pub mod loe;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ingest", post(loe::ingest))
        .route("/generate", post(loe::generate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::app::create_app;
    use crate::config::Settings;
    use crate::loe::{PostProcessor, PromptTemplates, RackUnitCatalog};
    use crate::services::{MockClient, TextGenerator};

    fn test_app(mock: MockClient) -> Router {
        let state = AppState::new(
            Settings::for_tests(),
            TextGenerator::Mock(mock),
            RackUnitCatalog::type_defaults_only(),
            PromptTemplates::default(),
            PostProcessor::default(),
        );
        create_app(state)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    // ── health ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn health_reports_mock_mode() {
        let response = test_app(MockClient::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = json_body(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["mode"], "mock");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    // ── ingest ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn ingest_rejects_blank_text() {
        let response = test_app(MockClient::new())
            .oneshot(post_json("/ingest", json!({"text": "   "})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert_eq!(body["message"], "Missing 'text'");
    }

    #[tokio::test]
    async fn ingest_rejects_malformed_json() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/ingest")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = test_app(MockClient::new()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ingest_returns_canonical_schema() {
        let response = test_app(MockClient::new())
            .oneshot(post_json(
                "/ingest",
                json!({"text": "Mount 6 AP64 at HQ, 1 Main St", "loe_type": "rack_stack"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let schema = &body["schema"];
        assert_eq!(schema["client"], "Mock Client");
        assert_eq!(schema["loe_type"], "rack_stack");
        assert_eq!(schema["notes_raw"], "Mount 6 AP64 at HQ, 1 Main St");
        assert_eq!(schema["sites"][0]["name"], "HQ");
        assert_eq!(schema["sites"][0]["bom"][0]["qty"], 6);
        assert_eq!(schema["bom"], json!([]));
    }

    // ── generate ───────────────────────────────────────────────────

    #[tokio::test]
    async fn generate_returns_processed_document() {
        let schema = json!({
            "client": "Acme",
            "sites": [{"name": "HQ", "address": "1 Main St", "bom": [{"type": "AP", "model": "AP64", "qty": 6}]}]
        });
        let response = test_app(MockClient::new())
            .oneshot(post_json("/generate", json!({"schema": schema})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let summary = body["summary"].as_str().unwrap();
        assert!(summary.starts_with("### Project Summary"));
        assert!(summary.contains("Acme has engaged WWT"));
        assert!(summary.contains("| AP64 |"));
        assert!(body["tasks"].as_str().unwrap().contains("### Out of Scope"));
        assert_eq!(body["open_questions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn generate_tolerates_missing_schema() {
        let response = test_app(MockClient::new())
            .oneshot(post_json("/generate", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
