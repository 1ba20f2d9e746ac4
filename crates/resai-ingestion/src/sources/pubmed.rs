//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch: {base}/esearch.fcgi  (JSON id list)
//!   efetch:  {base}/efetch.fcgi   (PubmedArticleSet XML)

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use resai_common::{PoliteClient, ResaiError};
use tracing::{debug, instrument};

use super::{clean_text, fetch_text, LiteratureSource, QueryPlan, SourceError};
use crate::models::{ArticleRecord, SourceTag};

pub const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

pub struct PubMedClient {
    client: PoliteClient,
    base_url: String,
    api_key: Option<String>,
}

impl PubMedClient {
    pub fn new(client: PoliteClient, api_key: Option<String>) -> Self {
        Self::with_base_url(client, EUTILS_BASE, api_key)
    }

    pub fn with_base_url(client: PoliteClient, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn params(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string())];
        params.extend_from_slice(extra);
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Search PubMed and return a list of PMIDs.
    #[instrument(skip(self))]
    async fn esearch(&self, term: &str, max: usize) -> Result<Vec<String>, ResaiError> {
        let url = format!("{}/esearch.fcgi", self.base_url);
        let params = self.params(&[
            ("term", term.to_string()),
            ("retmax", max.to_string()),
            ("retmode", "json".to_string()),
        ]);
        let body = fetch_text(self.client.get(&url).await?.query(&params)).await?;
        let resp: serde_json::Value = serde_json::from_str(&body)?;

        let ids: Vec<String> = resp["esearchresult"]["idlist"]
            .as_array()
            .map(|ids| ids.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        debug!(?ids, "PubMed esearch returned PMIDs");
        Ok(ids)
    }

    /// Fetch PubMed XML for a list of PMIDs.
    #[instrument(skip(self), fields(count = pmids.len()))]
    async fn efetch(&self, pmids: &[String]) -> Result<String, ResaiError> {
        let url = format!("{}/efetch.fcgi", self.base_url);
        let params = self.params(&[("id", pmids.join(",")), ("retmode", "xml".to_string())]);
        fetch_text(self.client.get(&url).await?.query(&params)).await
    }
}

#[async_trait]
impl LiteratureSource for PubMedClient {
    fn tag(&self) -> SourceTag {
        SourceTag::PubMed
    }

    fn plan(&self) -> QueryPlan {
        QueryPlan::PerKeyword
    }

    async fn search(&self, keywords: &[String], max_results: usize) -> Result<Vec<ArticleRecord>, SourceError> {
        let unavailable = |cause| SourceError::Unavailable { tag: SourceTag::PubMed, cause };
        let term = keywords.join(" ");

        let pmids = self.esearch(&term, max_results).await.map_err(unavailable)?;
        if pmids.is_empty() {
            return Ok(Vec::new());
        }
        let xml = self.efetch(&pmids).await.map_err(unavailable)?;
        parse_pubmed_xml(&xml).map_err(|e| SourceError::Malformed {
            tag: SourceTag::PubMed,
            reason: e.to_string(),
        })
    }
}

/// Per-article accumulator filled while walking the XML.
#[derive(Default)]
struct Draft {
    pmid: Option<String>,
    title: Vec<String>,
    abstract_parts: Vec<String>,
    abstract_current: Vec<String>,
    authors: Vec<String>,
    last_name: String,
    fore_name: String,
    journal: Option<String>,
    doi: Option<String>,
    article_id_doi: Option<String>,
    pub_year: Option<String>,
    pub_month: Option<String>,
    pub_day: Option<String>,
    medline_date: Option<String>,
    volume: Option<String>,
    issue: Option<String>,
    pages: Option<String>,
}

impl Draft {
    fn finish(self) -> ArticleRecord {
        let mut article = ArticleRecord::new(SourceTag::PubMed);
        article.title = clean_text(&self.title.join(" "));
        article.abstract_text = clean_text(&self.abstract_parts.join(" "));
        article.authors = self.authors;
        article.journal = self.journal;
        article.doi = self.doi.or(self.article_id_doi);
        article.url = self.pmid.as_ref().map(|id| format!("{ARTICLE_URL}/{id}/"));
        article.volume = self.volume;
        article.issue = self.issue;
        article.pages = self.pages;

        let year_text = self.pub_year.as_deref().or(self.medline_date.as_deref());
        article.year = year_text.and_then(leading_year);
        article.publication_date = match (&self.pub_year, &self.pub_month, &self.pub_day) {
            (Some(y), Some(m), Some(d)) => match (month_number(m), d.parse::<u32>()) {
                (Some(m), Ok(d)) => Some(format!("{y}-{m:02}-{d:02}")),
                _ => Some(format!("{y} {m} {d}")),
            },
            (Some(y), Some(m), None) => Some(match month_number(m) {
                Some(m) => format!("{y}-{m:02}"),
                None => format!("{y} {m}"),
            }),
            (Some(y), None, _) => Some(y.clone()),
            (None, ..) => self.medline_date.clone(),
        };
        article
    }
}

fn leading_year(text: &str) -> Option<i32> {
    text.get(..4).and_then(|y| y.parse().ok())
}

fn month_number(month: &str) -> Option<u32> {
    if let Ok(n) = month.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    const MONTHS: [&str; 12] = ["jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec"];
    let prefix = month.get(..3)?.to_lowercase();
    MONTHS.iter().position(|m| *m == prefix).map(|i| i as u32 + 1)
}

fn is_doi_id(e: &BytesStart<'_>, attr: &str) -> bool {
    e.try_get_attribute(attr)
        .ok()
        .flatten()
        .is_some_and(|a| a.value.as_ref() == b"doi")
}

/// Parse PubMed efetch XML into article records.
/// Walks `<PubmedArticleSet><PubmedArticle>` with an element stack.
pub fn parse_pubmed_xml(xml: &str) -> Result<Vec<ArticleRecord>, ResaiError> {
    let mut articles = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<Draft> = None;
    let mut doi_id_open = false;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"PubmedArticle" => current = Some(Draft::default()),
                    b"Author" => {
                        if let Some(d) = current.as_mut() {
                            d.last_name.clear();
                            d.fore_name.clear();
                        }
                    }
                    b"ELocationID" => doi_id_open = is_doi_id(e, "EIdType"),
                    b"ArticleId" => doi_id_open = is_doi_id(e, "IdType"),
                    _ => {}
                }
                stack.push(name);
            }
            Ok(Event::Text(ref e)) => {
                let Some(d) = current.as_mut() else { continue };
                let text = e
                    .unescape()
                    .map_err(|err| ResaiError::Xml(err.to_string()))?
                    .into_owned();
                let top = stack.last().map(Vec::as_slice).unwrap_or_default();
                let parent = stack.len().checked_sub(2).map(|i| stack[i].as_slice()).unwrap_or_default();
                let within = |tag: &[u8]| stack.iter().any(|s| s.as_slice() == tag);

                if within(b"ArticleTitle") {
                    d.title.push(text);
                } else if within(b"AbstractText") {
                    d.abstract_current.push(text);
                } else if within(b"Author") && top == b"LastName" {
                    d.last_name = text;
                } else if within(b"Author") && top == b"ForeName" {
                    d.fore_name = text;
                } else if top == b"PMID" && parent == b"MedlineCitation" && d.pmid.is_none() {
                    d.pmid = Some(text);
                } else if top == b"Title" && parent == b"Journal" {
                    d.journal = Some(text);
                } else if top == b"ELocationID" && doi_id_open {
                    d.doi = Some(text);
                } else if top == b"ArticleId" && doi_id_open && parent == b"ArticleIdList" && within(b"PubmedData") {
                    d.article_id_doi.get_or_insert(text);
                } else if within(b"PubDate") {
                    match top {
                        b"Year" => d.pub_year = Some(text),
                        b"Month" => d.pub_month = Some(text),
                        b"Day" => d.pub_day = Some(text),
                        b"MedlineDate" => d.medline_date = Some(text),
                        _ => {}
                    }
                } else if within(b"JournalIssue") && top == b"Volume" {
                    d.volume = Some(text);
                } else if within(b"JournalIssue") && top == b"Issue" {
                    d.issue = Some(text);
                } else if top == b"MedlinePgn" {
                    d.pages = Some(text);
                }
            }
            Ok(Event::End(ref e)) => {
                stack.pop();
                match e.name().as_ref() {
                    b"AbstractText" => {
                        if let Some(d) = current.as_mut() {
                            let part = d.abstract_current.join(" ");
                            d.abstract_current.clear();
                            if !part.is_empty() {
                                d.abstract_parts.push(part);
                            }
                        }
                    }
                    b"Author" => {
                        if let Some(d) = current.as_mut() {
                            let name = match (d.fore_name.is_empty(), d.last_name.is_empty()) {
                                (_, true) => None,
                                (true, false) => Some(d.last_name.clone()),
                                (false, false) => Some(format!("{} {}", d.fore_name, d.last_name)),
                            };
                            d.authors.extend(name);
                        }
                    }
                    b"ELocationID" | b"ArticleId" => doi_id_open = false,
                    b"PubmedArticle" => {
                        if let Some(d) = current.take() {
                            if d.title.is_empty() {
                                debug!(pmid = ?d.pmid, "PubMed article without title");
                            }
                            articles.push(d.finish());
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ResaiError::Xml(e.to_string())),
            _ => {}
        }
    }

    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE_XML: &str = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE">
      <PMID Version="1">31234567</PMID>
      <Article>
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <Volume>12</Volume>
            <Issue>3</Issue>
            <PubDate><Year>2021</Year><Month>Mar</Month><Day>05</Day></PubDate>
          </JournalIssue>
          <Title>Aging Cell</Title>
        </Journal>
        <ArticleTitle>Mitochondrial <i>decline</i> in aging</ArticleTitle>
        <Pagination><MedlinePgn>100-110</MedlinePgn></Pagination>
        <ELocationID EIdType="pii">e1234</ELocationID>
        <ELocationID EIdType="doi" ValidYN="Y">10.1111/acel.1234</ELocationID>
        <Abstract>
          <AbstractText Label="BACKGROUND">Mitochondria decline with age.</AbstractText>
          <AbstractText Label="RESULTS">We observed a 20% drop.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author><LastName>Smith</LastName><ForeName>Jane</ForeName></Author>
          <Author><CollectiveName>Aging Consortium</CollectiveName></Author>
          <Author><LastName>Lee</LastName></Author>
        </AuthorList>
      </Article>
      <CommentsCorrectionsList>
        <CommentsCorrections><PMID Version="1">999</PMID></CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID>42</PMID>
      <Article>
        <Journal>
          <JournalIssue><PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate></JournalIssue>
          <Title>Old Journal</Title>
        </Journal>
        <ArticleTitle>Telomeres &amp; you</ArticleTitle>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">42</ArticleId>
        <ArticleId IdType="doi">10.1000/old.42</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_full_article() {
        let articles = parse_pubmed_xml(SAMPLE_XML).unwrap();
        assert_eq!(articles.len(), 2);

        let a = &articles[0];
        assert_eq!(a.title.as_deref(), Some("Mitochondrial decline in aging"));
        assert_eq!(
            a.abstract_text.as_deref(),
            Some("Mitochondria decline with age. We observed a 20% drop.")
        );
        assert_eq!(a.authors, vec!["Jane Smith".to_string(), "Lee".to_string()]);
        assert_eq!(a.journal.as_deref(), Some("Aging Cell"));
        assert_eq!(a.doi.as_deref(), Some("10.1111/acel.1234"));
        assert_eq!(a.url.as_deref(), Some("https://pubmed.ncbi.nlm.nih.gov/31234567/"));
        assert_eq!(a.publication_date.as_deref(), Some("2021-03-05"));
        assert_eq!(a.year, Some(2021));
        assert_eq!(a.volume.as_deref(), Some("12"));
        assert_eq!(a.issue.as_deref(), Some("3"));
        assert_eq!(a.pages.as_deref(), Some("100-110"));
    }

    #[test]
    fn test_medline_date_and_article_id_doi() {
        let articles = parse_pubmed_xml(SAMPLE_XML).unwrap();
        let b = &articles[1];
        assert_eq!(b.title.as_deref(), Some("Telomeres & you"));
        assert_eq!(b.abstract_text, None);
        assert_eq!(b.doi.as_deref(), Some("10.1000/old.42"));
        assert_eq!(b.publication_date.as_deref(), Some("1998 Dec-1999 Jan"));
        assert_eq!(b.year, Some(1998));
        assert!(b.authors.is_empty());
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("Mar"), Some(3));
        assert_eq!(month_number("11"), Some(11));
        assert_eq!(month_number("13"), None);
        assert_eq!(month_number("Spring"), None);
    }

    #[tokio::test]
    async fn test_search_runs_esearch_then_efetch() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("term".into(), "longevity".into()),
                mockito::Matcher::UrlEncoded("retmax".into(), "5".into()),
            ]))
            .with_body(r#"{"esearchresult":{"idlist":["31234567","42"]}}"#)
            .create_async()
            .await;
        let fetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(mockito::Matcher::UrlEncoded("id".into(), "31234567,42".into()))
            .with_body(SAMPLE_XML)
            .create_async()
            .await;

        let client = PubMedClient::with_base_url(PoliteClient::new(100.0).unwrap(), server.url(), None);
        let articles = client.search(&["longevity".to_string()], 5).await.unwrap();
        assert_eq!(articles.len(), 2);
        search.assert_async().await;
        fetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_failure_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = PubMedClient::with_base_url(PoliteClient::new(100.0).unwrap(), server.url(), None);
        let err = client.search(&["aging".to_string()], 5).await.unwrap_err();
        assert!(matches!(
            err,
            SourceError::Unavailable { tag: SourceTag::PubMed, cause: ResaiError::Status { status: 500, .. } }
        ));
    }
}
