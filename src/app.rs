use anyhow::{Context, Result};
use axum::{http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Settings;
use crate::loe::{DocumentDefaults, Orchestrator, PostProcessor, PromptTemplates, RackUnitCatalog};
use crate::middleware::{request_id_layer, X_REQUEST_ID};
use crate::routes;
use crate::services::{AiClient, MockClient, TextGenerator};

/// Largest accepted request body. Notes and schemas are small text.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    pub settings: Settings,
    pub generator: TextGenerator,
    pub catalog: RackUnitCatalog,
    pub prompts: PromptTemplates,
    pub post_processor: PostProcessor,
}

impl AppState {
    pub fn new(
        settings: Settings,
        generator: TextGenerator,
        catalog: RackUnitCatalog,
        prompts: PromptTemplates,
        post_processor: PostProcessor,
    ) -> Arc<Self> {
        Arc::new(Self {
            settings,
            generator,
            catalog,
            prompts,
            post_processor,
        })
    }

    /// Build every process-wide component from settings.
    pub fn from_settings(settings: Settings) -> Result<Arc<Self>> {
        let generator = if settings.use_mock {
            tracing::info!("Using mock text generator");
            TextGenerator::Mock(MockClient::new())
        } else {
            TextGenerator::Remote(
                AiClient::new(
                    &settings.ai_api_base,
                    &settings.ai_api_key,
                    &settings.ai_model,
                    settings.ai_timeout_seconds,
                )
                .context("Failed to create AI client")?,
            )
        };

        let catalog = RackUnitCatalog::load(&settings.rack_units_path);
        if catalog.is_empty() {
            tracing::warn!("Rack-unit catalog has no model entries, only type defaults apply");
        }
        let prompts = PromptTemplates::load(&settings.prompts_dir);
        let post_processor = PostProcessor::new(DocumentDefaults::standard(&settings.provider_name));

        Ok(Self::new(settings, generator, catalog, prompts, post_processor))
    }

    pub fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator {
            generator: &self.generator,
            prompts: &self.prompts,
            catalog: &self.catalog,
            post_processor: &self.post_processor,
        }
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);

    // DEBUG spans keep INFO output quiet
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let (set_request_id, propagate_request_id) = request_id_layer();

    Router::new()
        .merge(routes::api_router())
        // Middleware stack (applied bottom-up)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let max_age = if settings.env.is_dev() {
        std::time::Duration::from_secs(86400)
    } else {
        std::time::Duration::from_secs(3600)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static(X_REQUEST_ID),
        ]))
        .max_age(max_age)
}
