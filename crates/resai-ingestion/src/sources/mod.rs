//! Literature source clients.

pub mod arxiv;
pub mod crossref;
pub mod pubmed;

use std::time::Duration;

use async_trait::async_trait;
use resai_common::ResaiError;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::models::{ArticleRecord, SourceTag};

pub use arxiv::ArxivClient;
pub use crossref::CrossRefClient;
pub use pubmed::PubMedClient;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{tag} request failed: {cause}")]
    Unavailable {
        tag: SourceTag,
        #[source]
        cause: ResaiError,
    },
    #[error("{tag} response could not be parsed: {reason}")]
    Malformed { tag: SourceTag, reason: String },
}

impl SourceError {
    pub fn tag(&self) -> SourceTag {
        match self {
            SourceError::Unavailable { tag, .. } | SourceError::Malformed { tag, .. } => *tag,
        }
    }
}

/// How a source wants the keyword list turned into queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPlan {
    /// One query per keyword; results are tagged with the keyword.
    PerKeyword,
    /// A single query built from every keyword.
    AllKeywords,
}

/// Common interface for all literature source clients.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    fn tag(&self) -> SourceTag;

    fn plan(&self) -> QueryPlan;

    /// Search with the given keywords, returning at most `max_results` records per query.
    async fn search(
        &self,
        keywords: &[String],
        max_results: usize,
    ) -> Result<Vec<ArticleRecord>, SourceError>;
}

/// A query that failed; the rest of the search carried on.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFailure {
    pub tag: SourceTag,
    pub keyword: Option<String>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub articles: Vec<ArticleRecord>,
    pub failures: Vec<SearchFailure>,
}

impl SearchOutcome {
    pub fn count_for(&self, tag: SourceTag) -> usize {
        self.articles.iter().filter(|a| a.source == tag).count()
    }
}

/// Queries every source in order, pausing `pause` between sources.
///
/// A failing query is logged and recorded, never fatal. Per-keyword
/// results keep keyword order, then source order.
#[instrument(skip_all, fields(sources = sources.len(), keywords = keywords.len()))]
pub async fn search_academic_sources(
    sources: &[Box<dyn LiteratureSource>],
    keywords: &[String],
    max_results: usize,
    pause: Duration,
) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();

    for (i, source) in sources.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
        let tag = source.tag();
        let before = outcome.articles.len();

        match source.plan() {
            QueryPlan::PerKeyword => {
                for keyword in keywords {
                    let query = std::slice::from_ref(keyword);
                    match source.search(query, max_results).await {
                        Ok(found) => {
                            if found.is_empty() {
                                info!(source = %tag, %keyword, "No results");
                            }
                            outcome.articles.extend(found.into_iter().map(|mut a| {
                                a.keyword.get_or_insert_with(|| keyword.clone());
                                a
                            }));
                        }
                        Err(e) => {
                            warn!(source = %tag, %keyword, error = %e, "Search failed, continuing");
                            outcome.failures.push(SearchFailure {
                                tag,
                                keyword: Some(keyword.clone()),
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }
            QueryPlan::AllKeywords => match source.search(keywords, max_results).await {
                Ok(found) => {
                    if found.is_empty() {
                        info!(source = %tag, "No results");
                    }
                    outcome.articles.extend(found);
                }
                Err(e) => {
                    warn!(source = %tag, error = %e, "Search failed, continuing");
                    outcome.failures.push(SearchFailure {
                        tag,
                        keyword: None,
                        reason: e.to_string(),
                    });
                }
            },
        }

        info!(source = %tag, found = outcome.articles.len() - before, "Source search complete");
    }

    outcome
}

/// Sends `req`, failing on non-success status, and returns the body text.
pub(crate) async fn fetch_text(req: reqwest::RequestBuilder) -> Result<String, ResaiError> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ResaiError::Status {
            status: status.as_u16(),
            url: resp.url().to_string(),
        });
    }
    Ok(resp.text().await?)
}

/// Collapses runs of whitespace, returning `None` for blank input.
pub(crate) fn clean_text(raw: &str) -> Option<String> {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
