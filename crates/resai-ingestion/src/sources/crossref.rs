//! CrossRef works search client.
//!
//! API: https://api.crossref.org/works?query=...&rows=N
//! Polite pool: pass a `mailto` (see CrossRef etiquette).

use async_trait::async_trait;
use regex::Regex;
use resai_common::{PoliteClient, ResaiError};
use std::sync::OnceLock;
use tracing::{debug, instrument};

use super::{clean_text, fetch_text, LiteratureSource, QueryPlan, SourceError};
use crate::models::{ArticleRecord, SourceTag};

pub const CR_WORKS_URL: &str = "https://api.crossref.org/works";
const SELECT: &str = "DOI,title,abstract,author,container-title,published,issued,volume,issue,page,URL";

pub struct CrossRefClient {
    client: PoliteClient,
    endpoint: String,
    mailto: Option<String>,
}

impl CrossRefClient {
    pub fn new(client: PoliteClient, mailto: Option<String>) -> Self {
        Self::with_endpoint(client, CR_WORKS_URL, mailto)
    }

    pub fn with_endpoint(client: PoliteClient, endpoint: impl Into<String>, mailto: Option<String>) -> Self {
        Self { client, endpoint: endpoint.into(), mailto }
    }

    /// Search CrossRef by free-text query.
    #[instrument(skip(self))]
    async fn search_works(&self, query: &str, rows: usize) -> Result<Vec<serde_json::Value>, ResaiError> {
        let mut params = vec![
            ("query", query.to_string()),
            ("rows", rows.to_string()),
            ("select", SELECT.to_string()),
        ];
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.clone()));
        }
        let body = fetch_text(self.client.get(&self.endpoint).await?.query(&params)).await?;
        let resp: serde_json::Value = serde_json::from_str(&body)?;

        Ok(resp["message"]["items"].as_array().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl LiteratureSource for CrossRefClient {
    fn tag(&self) -> SourceTag {
        SourceTag::CrossRef
    }

    fn plan(&self) -> QueryPlan {
        QueryPlan::AllKeywords
    }

    async fn search(&self, keywords: &[String], max_results: usize) -> Result<Vec<ArticleRecord>, SourceError> {
        let works = self
            .search_works(&keywords.join(" "), max_results)
            .await
            .map_err(|cause| SourceError::Unavailable { tag: SourceTag::CrossRef, cause })?;
        debug!(n = works.len(), "CrossRef search results");
        Ok(works.iter().map(work_to_article).collect())
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn jats_tags() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?jats:[^>]*>").expect("static regex"))
}

fn first_str(value: &serde_json::Value) -> Option<String> {
    value
        .as_array()
        .and_then(|a| a.first())
        .or(Some(value))
        .and_then(|v| v.as_str())
        .and_then(clean_text)
}

/// `date-parts` to (`YYYY[-MM[-DD]]`, year).
fn date_parts(value: &serde_json::Value) -> Option<(String, i32)> {
    let parts = value["date-parts"].as_array()?.first()?.as_array()?;
    let year = parts.first()?.as_i64()? as i32;
    let month = parts.get(1).and_then(|m| m.as_u64());
    let day = parts.get(2).and_then(|d| d.as_u64());
    let date = match (month, day) {
        (Some(m), Some(d)) => format!("{year:04}-{m:02}-{d:02}"),
        (Some(m), None) => format!("{year:04}-{m:02}"),
        _ => format!("{year:04}"),
    };
    Some((date, year))
}

pub(crate) fn work_to_article(work: &serde_json::Value) -> ArticleRecord {
    let mut article = ArticleRecord::new(SourceTag::CrossRef);
    article.doi = work["DOI"].as_str().and_then(clean_text);
    article.title = first_str(&work["title"]);
    article.abstract_text = work["abstract"]
        .as_str()
        .and_then(|a| clean_text(&jats_tags().replace_all(a, " ")));

    article.authors = work["author"]
        .as_array()
        .map(|authors| {
            authors
                .iter()
                .filter_map(|a| {
                    let given = a["given"].as_str().unwrap_or("").trim();
                    let family = a["family"].as_str().unwrap_or("").trim();
                    match (given.is_empty(), family.is_empty()) {
                        (true, true) => a["name"].as_str().and_then(clean_text),
                        (true, false) => Some(family.to_string()),
                        (false, true) => Some(given.to_string()),
                        (false, false) => Some(format!("{given} {family}")),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    article.journal = first_str(&work["container-title"]);
    article.volume = work["volume"].as_str().and_then(clean_text);
    article.issue = work["issue"].as_str().and_then(clean_text);
    article.pages = work["page"].as_str().and_then(clean_text);
    article.url = work["URL"]
        .as_str()
        .and_then(clean_text)
        .or_else(|| article.doi.as_ref().map(|doi| format!("https://doi.org/{doi}")));

    if let Some((date, year)) = date_parts(&work["published"]).or_else(|| date_parts(&work["issued"])) {
        article.publication_date = Some(date);
        article.year = Some(year);
    }
    article
}
