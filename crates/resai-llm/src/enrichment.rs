//! Enrichment collaborator: abstract summaries and methods/results descriptions.
//!
//! Both calls return `Result`; callers decide whether to substitute
//! `SUMMARY_FALLBACK` / `DESCRIPTION_FALLBACK` on failure.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::backend::{LlmBackend, LlmError, LlmRequest, Message};

pub const SUMMARY_FALLBACK: &str = "Summary not available.";
pub const DESCRIPTION_FALLBACK: &str = "Description generation failed.";

/// Sampling parameters for one kind of generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: Option<f32>,
}

impl GenerationParams {
    pub fn summary() -> Self {
        Self { temperature: 0.2, max_tokens: 512, top_p: Some(0.5) }
    }

    pub fn description() -> Self {
        Self { temperature: 0.3, max_tokens: 512, top_p: None }
    }
}

pub struct Enricher {
    backend: Arc<dyn LlmBackend>,
    summary: GenerationParams,
    description: GenerationParams,
}

impl Enricher {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            summary: GenerationParams::summary(),
            description: GenerationParams::description(),
        }
    }

    pub fn with_params(mut self, summary: GenerationParams, description: GenerationParams) -> Self {
        self.summary = summary;
        self.description = description;
        self
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    /// Concise summary of `text`.
    #[instrument(skip_all, fields(model = %self.backend.model_id(), chars = text.len()))]
    pub async fn summarize(&self, text: &str) -> Result<String, LlmError> {
        self.generate(summary_prompt(text), self.summary).await
    }

    /// Natural-language description of extracted methods and results.
    #[instrument(skip_all, fields(model = %self.backend.model_id(), methods = methods.len(), results = results.len()))]
    pub async fn describe(&self, methods: &[String], results: &[String]) -> Result<String, LlmError> {
        self.generate(description_prompt(methods, results), self.description).await
    }

    async fn generate(&self, prompt: String, params: GenerationParams) -> Result<String, LlmError> {
        let req = LlmRequest {
            messages: vec![Message::user(prompt)],
            model: None,
            max_tokens: Some(params.max_tokens),
            temperature: Some(params.temperature),
            top_p: params.top_p,
        };
        let resp = self.backend.complete(req).await?;
        debug!(
            prompt_tokens = resp.prompt_tokens,
            completion_tokens = resp.completion_tokens,
            "Completion received"
        );
        let content = resp.content.trim();
        if content.is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(content.to_string())
    }
}

pub fn summary_prompt(text: &str) -> String {
    format!("Summarize the following text in a concise manner:\n\n{text}")
}

pub fn description_prompt(methods: &[String], results: &[String]) -> String {
    format!(
        "Based on the following methods and results, generate a concise and clear description:\n\n\
         Methods:\n{}\n\nResults:\n{}\n\n\
         Provide a comprehensive summary that explains the significance and implications of these findings.",
        bullet_list(methods),
        bullet_list(results),
    )
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items.iter().map(|s| format!("- {}", s.trim())).collect::<Vec<_>>().join("\n")
}
