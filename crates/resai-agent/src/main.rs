//! ResearchAssistAI: literature search, harmonization and linked-data export.
//! Entry point for the agent binary.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use resai_common::PoliteClient;
use resai_ingestion::sources::{ArxivClient, CrossRefClient, PubMedClient};
use resai_ingestion::{
    load_json_table, BatchCheckpointer, LiteratureSource, Pipeline, PipelineError, PipelineJob, PipelineProgress,
    SourceTable, SourceTag, TesseractCli,
};
use resai_kg::OntologySchema;
use resai_llm::{Enricher, GenerationParams, LlmBackend, OllamaBackend, OpenAiCompatibleBackend};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn build_llm_backend(config: &config::LlmConfig) -> Arc<dyn LlmBackend> {
    match config.backend.as_str() {
        "openai_compatible" => {
            let key = config
                .api_key
                .clone()
                .or_else(|| std::env::var("RESAI_LLM_API_KEY").ok());
            Arc::new(OpenAiCompatibleBackend::new(&config.base_url, &config.model, key))
        }
        "ollama" => Arc::new(OllamaBackend::new(&config.base_url, &config.model)),
        other => {
            warn!(backend = other, "Unknown LLM backend, falling back to ollama");
            Arc::new(OllamaBackend::new(&config.base_url, &config.model))
        }
    }
}

fn build_sources(config: &config::SearchConfig) -> anyhow::Result<Vec<Box<dyn LiteratureSource>>> {
    let client = PoliteClient::new(config.requests_per_second)?;
    let mut sources: Vec<Box<dyn LiteratureSource>> = Vec::new();

    for name in &config.sources {
        match SourceTag::from_config_name(name) {
            Some(SourceTag::PubMed) => {
                sources.push(Box::new(PubMedClient::new(client.clone(), config.pubmed_api_key.clone())))
            }
            Some(SourceTag::Arxiv) => sources.push(Box::new(ArxivClient::new(client.clone()))),
            Some(SourceTag::CrossRef) => {
                sources.push(Box::new(CrossRefClient::new(client.clone(), config.crossref_mailto.clone())))
            }
            None => warn!(source = %name, "Unknown search source in config, skipping"),
        }
    }

    if sources.is_empty() {
        warn!("No search sources configured; only extra tables will be processed.");
    }
    Ok(sources)
}

fn build_schema(config: &config::OntologyConfig) -> anyhow::Result<OntologySchema> {
    let mut schema = OntologySchema::new(&config.namespace, &config.bio_namespace)?;
    for link in &config.links {
        schema = schema.with_link(&link.trigger, &link.concept)?;
    }
    Ok(schema)
}

fn load_extra_tables(paths: &[std::path::PathBuf]) -> anyhow::Result<Vec<SourceTable>> {
    paths
        .iter()
        .map(|path| {
            let table = load_json_table(path).with_context(|| format!("loading {}", path.display()))?;
            info!(table = %table.name, rows = table.len(), "Loaded extra table");
            Ok(table)
        })
        .collect()
}

/// Logs every progress event until the pipeline drops its sender.
fn spawn_progress_logger(mut progress_rx: broadcast::Receiver<PipelineProgress>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut seen = 0;
        loop {
            match progress_rx.recv().await {
                Ok(p) => {
                    seen += 1;
                    info!(
                        state = ?p.state,
                        found = p.articles_found,
                        enriched = p.records_enriched,
                        batches = p.batches_written,
                        "{}",
                        p.message
                    );
                }
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "Progress listener lagged"),
                Err(RecvError::Closed) => break,
            }
        }
        seen
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("resai=info,info")),
        )
        .init();

    info!("ResearchAssistAI starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match config::Config::load()? {
        Some(c) => c,
        None => {
            warn!("resai.toml not found, using defaults");
            warn!("Copy resai.example.toml to resai.toml and edit it.");
            config::Config::default()
        }
    };
    info!(
        keywords = config.search.keywords.len(),
        sources = ?config.search.sources,
        backend = %config.llm.backend,
        model = %config.llm.model,
        "Configuration loaded"
    );

    let sources = build_sources(&config.search)?;

    let llm = &config.llm;
    let enricher = Enricher::new(build_llm_backend(llm)).with_params(
        GenerationParams { temperature: llm.summary_temperature, max_tokens: llm.max_tokens, top_p: Some(llm.top_p) },
        GenerationParams { temperature: llm.description_temperature, max_tokens: llm.max_tokens, top_p: None },
    );

    let checkpointer = BatchCheckpointer::new(&config.checkpoint.dir, config.checkpoint.batch_size)?
        .with_resume(config.checkpoint.resume);
    let schema = build_schema(&config.ontology)?;

    let mut tesseract = TesseractCli::new(&config.ocr.tesseract_bin);
    if let Some(lang) = &config.ocr.language {
        tesseract = tesseract.with_language(lang);
    }
    let pipeline = Pipeline::new(sources, enricher, checkpointer, schema).with_ocr(Box::new(tesseract));

    let job = PipelineJob {
        keywords: config.search.keywords.clone(),
        max_results: config.search.max_results,
        source_pause: Duration::from_millis(config.search.source_pause_ms),
        max_attempts: config.enrichment.max_attempts,
        extra_tables: load_extra_tables(&config.harmonize.extra_tables)?,
        images: config.ocr.images.clone(),
        turtle_path: config.output.turtle_path.clone(),
        harmonized_path: config.output.harmonized_path.clone(),
    };

    let (progress_tx, progress_rx) = broadcast::channel::<PipelineProgress>(64);
    let listener = spawn_progress_logger(progress_rx);

    let result = pipeline.run(&job, Some(progress_tx)).await;
    let _ = listener.await;

    match result {
        Ok(report) => {
            for failure in &report.search_failures {
                warn!(source = %failure.tag, keyword = ?failure.keyword, "Search failed: {}", failure.reason);
            }
            for ocr in &report.ocr_texts {
                info!(image = %ocr.image.display(), "OCR text:\n{}", ocr.text);
            }
            info!(
                rows = report.table.len(),
                articles = report.graph.articles().len(),
                triples = report.graph.len(),
                batches = report.batches.len(),
                fallbacks = report.fallbacks,
                duration_ms = report.duration_ms,
                "Run complete"
            );
            Ok(())
        }
        Err(PipelineError::NothingToProcess) => {
            info!("No articles found. Nothing to process.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
