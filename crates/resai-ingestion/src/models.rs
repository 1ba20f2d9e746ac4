//! Data models for the ingestion pipeline.

use chrono::NaiveDate;
use resai_common::UNAVAILABLE;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::extraction::KeyInformation;

/// Which search collaborator produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    PubMed,
    #[serde(rename = "arXiv")]
    Arxiv,
    CrossRef,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::PubMed   => "PubMed",
            SourceTag::Arxiv    => "arXiv",
            SourceTag::CrossRef => "CrossRef",
        }
    }

    /// Parses a config name such as `pubmed` or `arxiv`.
    pub fn from_config_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "pubmed"   => Some(SourceTag::PubMed),
            "arxiv"    => Some(SourceTag::Arxiv),
            "crossref" => Some(SourceTag::CrossRef),
            _ => None,
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw article as returned by one search collaborator. Not modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    /// ISO `YYYY-MM-DD` when the source gave a full date, otherwise whatever it gave.
    pub publication_date: Option<String>,
    pub year: Option<i32>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub source: SourceTag,
    /// Search keyword that produced the record, for per-keyword sources.
    pub keyword: Option<String>,
}

impl ArticleRecord {
    pub fn new(source: SourceTag) -> Self {
        Self {
            title: None,
            abstract_text: None,
            authors: Vec::new(),
            journal: None,
            doi: None,
            url: None,
            publication_date: None,
            year: None,
            volume: None,
            issue: None,
            pages: None,
            source,
            keyword: None,
        }
    }

    pub fn title_or_sentinel(&self) -> &str {
        self.title.as_deref().unwrap_or(UNAVAILABLE)
    }

    pub fn abstract_or_sentinel(&self) -> &str {
        self.abstract_text.as_deref().unwrap_or(UNAVAILABLE)
    }
}

/// One row of a heterogeneous source table.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRow {
    /// Typed output of a built-in search client.
    Article(ArticleRecord),
    /// Loosely-typed row, e.g. an object from an exported JSON table.
    Loose(Map<String, Value>),
}

/// An ordered collection of rows from one origin.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceTable {
    pub name: String,
    pub rows: Vec<SourceRow>,
}

impl SourceTable {
    pub fn from_articles(name: impl Into<String>, articles: Vec<ArticleRecord>) -> Self {
        Self {
            name: name.into(),
            rows: articles.into_iter().map(SourceRow::Article).collect(),
        }
    }

    pub fn from_objects(name: impl Into<String>, objects: Vec<Map<String, Value>>) -> Self {
        Self {
            name: name.into(),
            rows: objects.into_iter().map(SourceRow::Loose).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Citable reference block stored alongside every enriched record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationInfo {
    pub authors: Vec<String>,
    pub year: String,
    pub title: String,
    pub journal: String,
    pub volume: String,
    pub issue: String,
    pub pages: String,
    pub doi: String,
    pub url: String,
    pub publication_date: String,
    pub accessed_date: String,
}

impl CitationInfo {
    pub fn from_article(article: &ArticleRecord, accessed: NaiveDate) -> Self {
        let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| UNAVAILABLE.to_string());
        Self {
            authors: article.authors.clone(),
            year: article.year.map(|y| y.to_string()).unwrap_or_else(|| UNAVAILABLE.to_string()),
            title: article.title_or_sentinel().to_string(),
            journal: or_na(&article.journal),
            volume: or_na(&article.volume),
            issue: or_na(&article.issue),
            pages: or_na(&article.pages),
            doi: or_na(&article.doi),
            url: or_na(&article.url),
            publication_date: or_na(&article.publication_date),
            accessed_date: accessed.format("%Y-%m-%d").to_string(),
        }
    }
}

/// An article after NLP enrichment; the unit written to batch files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub summary: String,
    pub extracted_info: KeyInformation,
    pub generated_description: String,
    pub citation_info: CitationInfo,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tag_names() {
        assert_eq!(SourceTag::Arxiv.to_string(), "arXiv");
        assert_eq!(SourceTag::from_config_name(" CrossRef "), Some(SourceTag::CrossRef));
        assert_eq!(SourceTag::from_config_name("scopus"), None);
        assert_eq!(serde_json::to_value(SourceTag::Arxiv).unwrap(), "arXiv");
    }

    #[test]
    fn test_citation_uses_sentinel_for_missing() {
        let mut article = ArticleRecord::new(SourceTag::PubMed);
        article.title = Some("Aging clocks".into());
        article.year = Some(2020);
        let accessed = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let c = CitationInfo::from_article(&article, accessed);
        assert_eq!(c.title, "Aging clocks");
        assert_eq!(c.year, "2020");
        assert_eq!(c.volume, "N/A");
        assert_eq!(c.accessed_date, "2024-01-02");
    }

    #[test]
    fn test_enriched_record_field_names() {
        let article = ArticleRecord::new(SourceTag::Arxiv);
        let record = EnrichedRecord {
            title: "t".into(),
            abstract_text: "a".into(),
            summary: "s".into(),
            extracted_info: KeyInformation::default(),
            generated_description: "d".into(),
            citation_info: CitationInfo::from_article(&article, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            source: "arXiv".into(),
        };
        let value = serde_json::to_value(&record).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for key in ["title", "abstract", "summary", "extracted_info", "generated_description", "citation_info", "source"] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert!(value["extracted_info"].get("METHODS").is_some());
    }
}
