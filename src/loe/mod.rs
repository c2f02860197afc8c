//! Level-of-Effort pipeline: schema normalization, enrichment, prompt
//! construction and document post-processing.

pub mod catalog;
pub mod coerce;
pub mod defaults;
pub mod derive;
pub mod json;
pub mod markdown;
pub mod normalize;
pub mod orchestrator;
pub mod post_process;
pub mod prompts;
pub mod tables;

pub use catalog::RackUnitCatalog;
pub use defaults::DocumentDefaults;
pub use orchestrator::Orchestrator;
pub use post_process::PostProcessor;
pub use prompts::PromptTemplates;
