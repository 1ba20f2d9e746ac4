//! Shared fakes for pipeline integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use resai_ingestion::{ArticleRecord, LiteratureSource, QueryPlan, SourceError, SourceTag};
use resai_llm::{Enricher, LlmBackend, LlmError, LlmRequest, LlmResponse};

/// Returns a fixed article list regardless of keywords.
pub struct FixedSource {
    pub tag: SourceTag,
    pub articles: Vec<ArticleRecord>,
}

#[async_trait]
impl LiteratureSource for FixedSource {
    fn tag(&self) -> SourceTag {
        self.tag
    }

    fn plan(&self) -> QueryPlan {
        QueryPlan::AllKeywords
    }

    async fn search(&self, _keywords: &[String], max_results: usize) -> Result<Vec<ArticleRecord>, SourceError> {
        Ok(self.articles.iter().take(max_results).cloned().collect())
    }
}

/// Always fails, as an unreachable API would.
pub struct DownSource(pub SourceTag);

#[async_trait]
impl LiteratureSource for DownSource {
    fn tag(&self) -> SourceTag {
        self.0
    }

    fn plan(&self) -> QueryPlan {
        QueryPlan::PerKeyword
    }

    async fn search(&self, _keywords: &[String], _max: usize) -> Result<Vec<ArticleRecord>, SourceError> {
        Err(SourceError::Malformed { tag: self.0, reason: "service down".into() })
    }
}

/// Echoes a canned completion; prompts containing `FAIL` error out.
#[derive(Default)]
pub struct ScriptedLlm {
    pub calls: AtomicUsize,
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = &req.messages[0].content;
        if prompt.contains("FAIL") {
            return Err(LlmError::Unavailable("scripted failure".into()));
        }
        let content = if prompt.starts_with("Summarize") {
            "A short summary."
        } else {
            "A generated description."
        };
        Ok(LlmResponse {
            content: content.into(),
            model: "scripted".into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        })
    }

    fn model_id(&self) -> &str {
        "scripted"
    }

    fn is_local(&self) -> bool {
        true
    }
}

impl ScriptedLlm {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn enricher(llm: &Arc<ScriptedLlm>) -> Enricher {
    Enricher::new(llm.clone())
}

pub fn article(source: SourceTag, title: &str, abstract_text: Option<&str>) -> ArticleRecord {
    let mut a = ArticleRecord::new(source);
    a.title = Some(title.to_string());
    a.abstract_text = abstract_text.map(String::from);
    a.authors = vec!["Jane Doe".into()];
    a.publication_date = Some("2023-01-15".into());
    a.year = Some(2023);
    a
}
