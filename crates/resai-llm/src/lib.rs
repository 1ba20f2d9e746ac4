//! resai-llm: Language-model backends and the enrichment collaborator
//! (abstract summaries and methods/results descriptions).

pub mod backend;
pub mod enrichment;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message, OllamaBackend, OpenAiCompatibleBackend};
pub use enrichment::{Enricher, GenerationParams, DESCRIPTION_FALLBACK, SUMMARY_FALLBACK};
