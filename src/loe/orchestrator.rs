//! Ingest and generate flows.
//!
//! Glue between the generator, the prompt templates, the normalizer, the
//! catalog and the post-processor. Neither flow fails on malformed model
//! output; only backend transport errors propagate.

use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use super::catalog::RackUnitCatalog;
use super::coerce;
use super::json::coerce_object;
use super::normalize::normalize;
use super::post_process::PostProcessor;
use super::prompts::PromptTemplates;
use crate::domain::{GeneratedDocument, ProjectSchema};
use crate::services::{GeneratorError, TextGenerator};

/// Notes shorter than this are not worth a model call.
pub const MIN_INGEST_CHARS: usize = 10;
pub const INGEST_MAX_TOKENS: u32 = 2500;
pub const GENERATE_MAX_TOKENS: u32 = 3000;

const NON_JSON_QUESTION: &str = "Non-JSON response from model";

/// Borrowed view over the process-wide LoE components.
#[derive(Clone, Copy)]
pub struct Orchestrator<'a> {
    pub generator: &'a TextGenerator,
    pub prompts: &'a PromptTemplates,
    pub catalog: &'a RackUnitCatalog,
    pub post_processor: &'a PostProcessor,
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

impl Orchestrator<'_> {
    /// Extract a canonical schema from free-text notes.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn ingest(&self, text: &str, loe_type: Option<&str>) -> Result<ProjectSchema, GeneratorError> {
        let text = text.trim();
        let mut schema = if text.chars().count() < MIN_INGEST_CHARS {
            warn!("Notes too short to extract, returning empty schema");
            ProjectSchema::empty(text)
        } else {
            let raw = self
                .generator
                .complete(
                    &self.prompts.ingest_prompt(text),
                    Some(&self.prompts.ingest_system),
                    false,
                    INGEST_MAX_TOKENS,
                )
                .await?;

            let mut object = coerce_object(&raw).unwrap_or_else(|| {
                warn!(len = raw.len(), "Ingest reply is not a JSON object, using empty schema");
                Map::new()
            });
            object.insert("notes_raw".to_string(), Value::String(text.to_string()));
            self.catalog.enrich(normalize(&Value::Object(object)))
        };

        if let Some(loe_type) = non_empty(loe_type) {
            schema.loe_type = loe_type.to_string();
        }

        info!(sites = schema.sites.len(), "Schema extracted");
        Ok(schema)
    }

    /// Generate and post-process an LoE document from a (possibly edited)
    /// schema.
    #[instrument(skip(self, schema_value))]
    pub async fn generate(
        &self,
        schema_value: &Value,
        loe_type: Option<&str>,
    ) -> Result<GeneratedDocument, GeneratorError> {
        let mut schema = self.catalog.enrich(normalize(schema_value));
        if schema.loe_type.is_empty() {
            if let Some(loe_type) = non_empty(loe_type) {
                schema.loe_type = loe_type.to_string();
            }
        }

        let raw = self
            .generator
            .complete(
                &self.prompts.generate_prompt(&schema),
                Some(&self.prompts.generate_system),
                true,
                GENERATE_MAX_TOKENS,
            )
            .await?;

        let draft = coerce_document(&raw);
        let document = self.post_processor.process(&schema, draft);
        info!(
            summary_len = document.summary.len(),
            tasks_len = document.tasks.len(),
            open_questions = document.open_questions.len(),
            "Document generated"
        );
        Ok(document)
    }
}

/// Read a generator reply as a draft document.
fn coerce_document(raw: &str) -> GeneratedDocument {
    let Some(object) = coerce_object(raw) else {
        warn!(len = raw.len(), "Generate reply is not a JSON object");
        return GeneratedDocument {
            open_questions: vec![NON_JSON_QUESTION.to_string()],
            ..GeneratedDocument::default()
        };
    };

    let open_questions = match object.get("open_questions") {
        Some(Value::Array(items)) => items.iter().map(coerce::trim).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![coerce::trim(other)],
    };

    GeneratedDocument {
        summary: coerce::trim_opt(object.get("summary")),
        tasks: coerce::trim_opt(object.get("tasks")),
        open_questions,
    }
}
