//! End-to-end research pipeline.
//!
//! Orchestrates one run:
//!   1. Search every configured source for the keywords
//!   2. Harmonize search results and extra tables into the canonical table
//!   3. Enrich each searched article (key information, summary, description,
//!      citation block), checkpointing full batches as they fill
//!   4. Build the RDF graph from the canonical table
//!   5. Flush the last batch and write the Turtle/JSON exports
//!   6. Emit progress events via broadcast channel
//!
//! Enrichment is retried per record; a record whose calls keep failing is
//! kept with fallback text. The only terminal outcome besides I/O failure
//! is a run with nothing to process.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use resai_common::{CanonicalTable, ResaiError, UNAVAILABLE};
use resai_kg::{build_graph, ArticleGraph, KgError, OntologySchema};
use resai_llm::{Enricher, LlmError, DESCRIPTION_FALLBACK, SUMMARY_FALLBACK};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::checkpoint::{BatchCheckpointer, BatchHandle, CheckpointError};
use crate::extraction::extract_key_information;
use crate::models::{ArticleRecord, CitationInfo, EnrichedRecord, SourceTable};
use crate::normalise::{harmonize, write_table_json};
use crate::ocr::TextExtractor;
use crate::sources::{search_academic_sources, LiteratureSource, SearchFailure};

pub const DEFAULT_KEYWORDS: [&str; 7] = [
    "longevity",
    "mitochondrial",
    "aging",
    "protein folding",
    "autophagy",
    "bio multi-modal datasets",
    "machine learning",
];

// ── Job config ────────────────────────────────────────────────────────────────

/// Parameters for a single pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineJob {
    pub keywords: Vec<String>,
    pub max_results: usize,
    /// Pause between consecutive sources.
    pub source_pause: Duration,
    /// Attempts per enrichment call before the fallback text is used.
    pub max_attempts: u32,
    /// Pre-loaded tables harmonized alongside the search results.
    pub extra_tables: Vec<SourceTable>,
    /// Chart/figure images handed to the OCR collaborator.
    pub images: Vec<PathBuf>,
    pub turtle_path: Option<PathBuf>,
    pub harmonized_path: Option<PathBuf>,
}

impl Default for PipelineJob {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            max_results: 5,
            source_pause: Duration::from_secs(1),
            max_attempts: 2,
            extra_tables: Vec::new(),
            images: Vec::new(),
            turtle_path: None,
            harmonized_path: None,
        }
    }
}

// ── Progress events ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Searching,
    Harmonizing,
    Enriching,
    GraphBuilding,
    Persisting,
    Done,
}

/// Progress event emitted on every state transition (cloneable for broadcast).
#[derive(Debug, Clone, Serialize)]
pub struct PipelineProgress {
    pub job_id: Uuid,
    pub state: PipelineState,
    pub message: String,
    pub articles_found: usize,
    pub records_enriched: usize,
    pub batches_written: usize,
}

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OcrText {
    pub image: PathBuf,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub job_id: Uuid,
    pub articles_found: usize,
    /// Records enriched in this run.
    pub records_enriched: usize,
    /// Records covered by batch files kept from an earlier run.
    pub records_resumed: usize,
    /// Enrichment fields that fell back to the placeholder text.
    pub fallbacks: usize,
    pub batches: Vec<BatchHandle>,
    pub search_failures: Vec<SearchFailure>,
    pub ocr_texts: Vec<OcrText>,
    pub ocr_failures: Vec<String>,
    pub table: CanonicalTable,
    pub graph: ArticleGraph,
    pub duration_ms: u64,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no articles found in any source; nothing to process")]
    NothingToProcess,
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error("graph export failed: {0}")]
    Graph(#[from] KgError),
    #[error("failed to write {}: {source}", path.display())]
    Export { path: PathBuf, source: ResaiError },
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

/// Collaborators are built once and shared by every stage.
pub struct Pipeline {
    sources: Vec<Box<dyn LiteratureSource>>,
    enricher: Enricher,
    checkpointer: BatchCheckpointer,
    schema: OntologySchema,
    ocr: Option<Box<dyn TextExtractor>>,
}

impl Pipeline {
    pub fn new(
        sources: Vec<Box<dyn LiteratureSource>>,
        enricher: Enricher,
        checkpointer: BatchCheckpointer,
        schema: OntologySchema,
    ) -> Self {
        Self { sources, enricher, checkpointer, schema, ocr: None }
    }

    pub fn with_ocr(mut self, ocr: Box<dyn TextExtractor>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn schema(&self) -> &OntologySchema {
        &self.schema
    }

    /// Runs every stage for one job.
    ///
    /// Progress events are sent via `progress_tx` if provided.
    #[instrument(skip_all, fields(keywords = job.keywords.len(), sources = self.sources.len()))]
    pub async fn run(
        &self,
        job: &PipelineJob,
        progress_tx: Option<broadcast::Sender<PipelineProgress>>,
    ) -> Result<PipelineReport, PipelineError> {
        let job_id = Uuid::new_v4();
        let t0 = std::time::Instant::now();
        let mut progress = PipelineProgress {
            job_id,
            state: PipelineState::Idle,
            message: String::new(),
            articles_found: 0,
            records_enriched: 0,
            batches_written: 0,
        };
        let emit = |state: PipelineState, message: String, progress: &mut PipelineProgress| {
            progress.state = state;
            progress.message = message;
            debug!(?state, message = %progress.message, "Pipeline state");
            if let Some(ref tx) = progress_tx {
                let _ = tx.send(progress.clone());
            }
        };
        emit(PipelineState::Idle, "Pipeline created".into(), &mut progress);
        info!(%job_id, "Starting research pipeline");

        // ── 1. Search ────────────────────────────────────────────────────────
        emit(
            PipelineState::Searching,
            format!("Searching {} sources for {} keywords", self.sources.len(), job.keywords.len()),
            &mut progress,
        );
        let outcome =
            search_academic_sources(&self.sources, &job.keywords, job.max_results, job.source_pause).await;
        let articles = outcome.articles;
        progress.articles_found = articles.len();

        let extra_rows: usize = job.extra_tables.iter().map(SourceTable::len).sum();
        if articles.is_empty() && extra_rows == 0 {
            info!(%job_id, failures = outcome.failures.len(), "No articles found");
            emit(PipelineState::Done, "No articles found".into(), &mut progress);
            return Err(PipelineError::NothingToProcess);
        }
        info!(n = articles.len(), extra_rows, "Articles retrieved");

        // ── 2. Harmonize ─────────────────────────────────────────────────────
        emit(
            PipelineState::Harmonizing,
            format!("Harmonizing {} articles and {} extra rows", articles.len(), extra_rows),
            &mut progress,
        );
        let mut tables = Vec::with_capacity(job.extra_tables.len() + 1);
        tables.push(SourceTable::from_articles("search", articles.clone()));
        tables.extend(job.extra_tables.iter().cloned());
        let table = harmonize(&tables);
        info!("Harmonized preview:\n{}", table.preview(5));

        // ── 3. Enrich + checkpoint ───────────────────────────────────────────
        emit(
            PipelineState::Enriching,
            format!("Enriching {} articles", articles.len()),
            &mut progress,
        );
        let accessed = chrono::Local::now().date_naive();
        let mut acc = self.checkpointer.accumulator::<EnrichedRecord>();
        let mut batches = Vec::new();
        let mut fallbacks = 0;
        let mut records_enriched = 0;
        let mut records_resumed = 0;

        let mut i = 0;
        while i < articles.len() {
            if let Some(span) = acc.upcoming_span(articles.len() - i) {
                let covered = &articles[i..i + span.count()];
                match self.checkpointer.load_existing::<EnrichedRecord>(&span) {
                    Some(existing) if same_articles(&existing, covered) => {
                        info!(first = span.first, last = span.last, "Batch already persisted, skipping enrichment");
                        acc.skip(span.count());
                        batches.push(self.checkpointer.reused(span));
                        records_resumed += span.count();
                        i += span.count();
                        continue;
                    }
                    Some(_) => warn!(first = span.first, last = span.last, "Batch file covers other articles, re-enriching"),
                    None => {}
                }
            }

            let (record, failed) = self.enrich(&articles[i], job.max_attempts, accessed).await;
            fallbacks += failed;
            records_enriched += 1;
            progress.records_enriched = records_enriched;
            if let Some(batch) = acc.push(record) {
                batches.push(self.checkpointer.write_batch(&batch)?);
                progress.batches_written = batches.len();
            }
            i += 1;
        }

        let (ocr_texts, ocr_failures) = self.run_ocr(&job.images).await;

        // ── 4. Graph ─────────────────────────────────────────────────────────
        emit(
            PipelineState::GraphBuilding,
            format!("Building graph from {} rows", table.len()),
            &mut progress,
        );
        let graph = build_graph(&table, &self.schema);

        // ── 5. Persist ───────────────────────────────────────────────────────
        emit(PipelineState::Persisting, "Writing batches and exports".into(), &mut progress);
        if let Some(batch) = acc.flush() {
            batches.push(self.checkpointer.write_batch(&batch)?);
            progress.batches_written = batches.len();
        }
        if let Some(path) = &job.turtle_path {
            let ttl = graph.to_turtle()?;
            write_export(path, ttl.as_bytes())?;
            info!(path = %path.display(), triples = graph.len(), "Turtle written");
        }
        if let Some(path) = &job.harmonized_path {
            write_table_json(&table, path).map_err(|source| PipelineError::Export {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), rows = table.len(), "Harmonized table written");
        }

        let report = PipelineReport {
            job_id,
            articles_found: articles.len(),
            records_enriched,
            records_resumed,
            fallbacks,
            batches,
            search_failures: outcome.failures,
            ocr_texts,
            ocr_failures,
            table,
            graph,
            duration_ms: t0.elapsed().as_millis() as u64,
        };
        emit(
            PipelineState::Done,
            format!("Done: {} rows, {} batches", report.table.len(), report.batches.len()),
            &mut progress,
        );
        info!(
            %job_id,
            articles = report.articles_found,
            enriched = report.records_enriched,
            resumed = report.records_resumed,
            fallbacks = report.fallbacks,
            triples = report.graph.len(),
            duration_ms = report.duration_ms,
            "Pipeline complete"
        );
        Ok(report)
    }

    /// Builds the enriched record for one article; also returns how many
    /// fields fell back to placeholder text.
    async fn enrich(&self, article: &ArticleRecord, max_attempts: u32, accessed: NaiveDate) -> (EnrichedRecord, usize) {
        let title = article.title_or_sentinel();
        let mut failed = 0;

        let (extracted_info, summary, generated_description) = match article.abstract_text.as_deref() {
            Some(text) => {
                let info = extract_key_information(text);
                let summary = with_retries(max_attempts, "summary", title, || self.enricher.summarize(text))
                    .await
                    .unwrap_or_else(|| {
                        failed += 1;
                        SUMMARY_FALLBACK.to_string()
                    });
                let description = with_retries(max_attempts, "description", title, || {
                    self.enricher.describe(&info.methods, &info.results)
                })
                .await
                .unwrap_or_else(|| {
                    failed += 1;
                    DESCRIPTION_FALLBACK.to_string()
                });
                (info, summary, description)
            }
            None => {
                debug!(%title, "No abstract, skipping enrichment calls");
                (Default::default(), SUMMARY_FALLBACK.to_string(), DESCRIPTION_FALLBACK.to_string())
            }
        };

        let record = EnrichedRecord {
            title: title.to_string(),
            abstract_text: article.abstract_or_sentinel().to_string(),
            summary,
            extracted_info,
            generated_description,
            citation_info: CitationInfo::from_article(article, accessed),
            source: article.source.to_string(),
        };
        (record, failed)
    }

    async fn run_ocr(&self, images: &[PathBuf]) -> (Vec<OcrText>, Vec<String>) {
        let mut texts = Vec::new();
        let mut failures = Vec::new();
        let Some(ocr) = &self.ocr else {
            if !images.is_empty() {
                warn!(n = images.len(), "Images configured but no OCR extractor available");
            }
            return (texts, failures);
        };
        for image in images {
            match ocr.extract_text(image).await {
                Ok(text) => {
                    info!(image = %image.display(), chars = text.len(), "Extracted text from image");
                    texts.push(OcrText { image: image.clone(), text });
                }
                Err(e) => {
                    warn!(image = %image.display(), error = %e, "OCR failed, continuing");
                    failures.push(format!("{}: {e}", image.display()));
                }
            }
        }
        (texts, failures)
    }
}

/// Whether an existing batch was enriched from these articles, in order.
fn same_articles(existing: &[EnrichedRecord], articles: &[ArticleRecord]) -> bool {
    existing.len() == articles.len()
        && existing.iter().zip(articles).all(|(record, article)| {
            record.title == article.title_or_sentinel()
                && record.citation_info.doi == article.doi.as_deref().unwrap_or(UNAVAILABLE)
        })
}

async fn with_retries<F, Fut>(max_attempts: u32, what: &str, title: &str, mut call: F) -> Option<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, LlmError>>,
{
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        match call().await {
            Ok(text) => return Some(text),
            Err(e) => warn!(attempt, attempts, what, %title, error = %e, "Enrichment call failed"),
        }
    }
    None
}

fn write_export(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let export_err = |source: std::io::Error| PipelineError::Export {
        path: path.to_path_buf(),
        source: source.into(),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(export_err)?;
    }
    std::fs::write(path, bytes).map_err(export_err)
}
