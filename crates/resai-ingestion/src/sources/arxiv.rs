//! arXiv Atom API client.
//!
//! One query per search: every keyword joined with `AND` over all fields.

use async_trait::async_trait;
use chrono::{DateTime, Datelike};
use quick_xml::de::from_str;
use resai_common::{PoliteClient, ResaiError};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{clean_text, fetch_text, LiteratureSource, QueryPlan, SourceError};
use crate::models::{ArticleRecord, SourceTag};

pub const ARXIV_API: &str = "http://export.arxiv.org/api/query";
const ARXIV_JOURNAL: &str = "arXiv";

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: String,
    #[serde(default)]
    title: String,
    summary: Option<String>,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "arxiv:doi", alias = "doi")]
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: String,
}

pub struct ArxivClient {
    client: PoliteClient,
    endpoint: String,
}

impl ArxivClient {
    pub fn new(client: PoliteClient) -> Self {
        Self::with_endpoint(client, ARXIV_API)
    }

    pub fn with_endpoint(client: PoliteClient, endpoint: impl Into<String>) -> Self {
        Self { client, endpoint: endpoint.into() }
    }

    #[instrument(skip(self))]
    async fn query(&self, search_query: &str, max: usize) -> Result<String, ResaiError> {
        let req = self.client.get(&self.endpoint).await?.query(&[
            ("search_query", search_query.to_string()),
            ("start", "0".to_string()),
            ("max_results", max.to_string()),
        ]);
        fetch_text(req).await
    }
}

/// `all:"k1" AND all:"k2" ...`
pub fn build_query(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| format!("all:\"{}\"", k.trim()))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[async_trait]
impl LiteratureSource for ArxivClient {
    fn tag(&self) -> SourceTag {
        SourceTag::Arxiv
    }

    fn plan(&self) -> QueryPlan {
        QueryPlan::AllKeywords
    }

    async fn search(&self, keywords: &[String], max_results: usize) -> Result<Vec<ArticleRecord>, SourceError> {
        let query = build_query(keywords);
        let xml = self
            .query(&query, max_results)
            .await
            .map_err(|cause| SourceError::Unavailable { tag: SourceTag::Arxiv, cause })?;
        let articles = parse_atom_feed(&xml)?;
        debug!(n = articles.len(), "arXiv search results");
        Ok(articles)
    }
}

/// Parse an arXiv Atom feed into article records.
pub fn parse_atom_feed(xml: &str) -> Result<Vec<ArticleRecord>, SourceError> {
    let malformed = |reason: String| SourceError::Malformed { tag: SourceTag::Arxiv, reason };
    let feed: AtomFeed = from_str(xml).map_err(|e| malformed(format!("invalid atom xml: {e}")))?;

    // The API reports bad queries as a single entry under /api/errors.
    if let Some(err) = feed.entries.iter().find(|e| e.id.contains("/api/errors")) {
        let detail = err.summary.as_deref().and_then(clean_text).unwrap_or_default();
        return Err(malformed(format!("arXiv API error: {detail}")));
    }

    Ok(feed.entries.into_iter().map(entry_to_article).collect())
}

fn entry_to_article(entry: AtomEntry) -> ArticleRecord {
    let mut article = ArticleRecord::new(SourceTag::Arxiv);
    article.title = clean_text(&entry.title);
    article.abstract_text = entry.summary.as_deref().and_then(clean_text);
    article.authors = entry.authors.iter().filter_map(|a| clean_text(&a.name)).collect();
    article.journal = Some(ARXIV_JOURNAL.to_string());
    article.url = clean_text(&entry.id);
    article.doi = entry.doi.as_deref().and_then(clean_text);

    if let Some(published) = entry.published.as_deref().map(str::trim) {
        match DateTime::parse_from_rfc3339(published) {
            Ok(dt) => {
                article.publication_date = Some(dt.date_naive().format("%Y-%m-%d").to_string());
                article.year = Some(dt.year());
            }
            Err(_) => article.publication_date = clean_text(published),
        }
    }
    article
}
