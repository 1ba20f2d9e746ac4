//! Offline end-to-end runs of the pipeline with fake collaborators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{article, enricher, DownSource, FixedSource, ScriptedLlm};
use pretty_assertions::assert_eq;
use resai_common::FieldValue;
use resai_ingestion::{
    BatchCheckpointer, EnrichedRecord, LiteratureSource, Pipeline, PipelineError, PipelineJob, PipelineState,
    SourceTable, SourceTag,
};
use resai_kg::{from_turtle, OntologySchema};
use serde_json::json;

fn seven_articles() -> Vec<resai_ingestion::ArticleRecord> {
    (1..=7)
        .map(|i| {
            let abstract_text = match i {
                3 => "This study of cancer used a new FAIL method. The results were clear.".to_string(),
                6 => return article(SourceTag::PubMed, &format!("Article {i}"), None),
                _ => format!("Our method measured aging in cohort {i}. The results show improvement."),
            };
            article(SourceTag::PubMed, &format!("Article {i}"), Some(&abstract_text))
        })
        .collect()
}

fn job(dir: &std::path::Path) -> PipelineJob {
    PipelineJob {
        keywords: vec!["aging".into()],
        max_results: 10,
        source_pause: Duration::ZERO,
        max_attempts: 2,
        turtle_path: Some(dir.join("out/graph.ttl")),
        harmonized_path: Some(dir.join("out/harmonized.json")),
        ..PipelineJob::default()
    }
}

#[tokio::test]
async fn full_run_batches_enriches_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let sources: Vec<Box<dyn LiteratureSource>> = vec![
        Box::new(DownSource(SourceTag::CrossRef)),
        Box::new(FixedSource { tag: SourceTag::PubMed, articles: seven_articles() }),
    ];
    let checkpointer = BatchCheckpointer::new(dir.path().join("processed_articles"), 5).unwrap();
    let pipeline = Pipeline::new(sources, enricher(&llm), checkpointer.clone(), OntologySchema::default());

    let (tx, mut rx) = tokio::sync::broadcast::channel(32);
    let report = pipeline.run(&job(dir.path()), Some(tx)).await.unwrap();

    // Search failure is recorded, not fatal.
    assert_eq!(report.search_failures.len(), 1);
    assert_eq!(report.search_failures[0].tag, SourceTag::CrossRef);
    assert_eq!(report.articles_found, 7);

    // 7 records, batch size 5 → 1..5 and 6..7.
    let names: Vec<_> = report
        .batches
        .iter()
        .map(|h| h.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["articles_1_to_5.json", "articles_6_to_7.json"]);

    let first: Vec<EnrichedRecord> = checkpointer.read_batch(&report.batches[0]).unwrap();
    let second: Vec<EnrichedRecord> = checkpointer.read_batch(&report.batches[1]).unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(second.len(), 2);

    // Record 3 keeps failing: retained with fallbacks after two attempts each.
    assert_eq!(first[2].summary, "Summary not available.");
    assert_eq!(first[2].generated_description, "Description generation failed.");
    assert_eq!(first[2].extracted_info.diseases, vec!["cancer"]);
    assert_eq!(report.fallbacks, 2);
    assert_eq!(first[0].summary, "A short summary.");
    assert_eq!(first[0].citation_info.year, "2023");
    assert_eq!(first[0].source, "PubMed");

    // Record 6 has no abstract: sentinel and no model calls.
    assert_eq!(second[0].abstract_text, "N/A");
    assert_eq!(second[0].summary, "Summary not available.");
    // 6 records with abstracts x 2 calls, plus one extra attempt per failing call.
    assert_eq!(llm.calls(), 6 * 2 + 2);

    // Graph: one article node per harmonized row, exported as Turtle.
    assert_eq!(report.table.len(), 7);
    assert_eq!(report.graph.articles().len(), 7);
    let ttl = std::fs::read_to_string(dir.path().join("out/graph.ttl")).unwrap();
    assert_eq!(from_turtle(&ttl).unwrap().len(), report.graph.len());
    assert!(dir.path().join("out/harmonized.json").is_file());

    // Every state is announced, in order.
    let mut states = Vec::new();
    while let Ok(p) = rx.try_recv() {
        if states.last() != Some(&p.state) {
            states.push(p.state);
        }
    }
    assert_eq!(
        states,
        vec![
            PipelineState::Idle,
            PipelineState::Searching,
            PipelineState::Harmonizing,
            PipelineState::Enriching,
            PipelineState::GraphBuilding,
            PipelineState::Persisting,
            PipelineState::Done,
        ]
    );
}

fn resuming_pipeline(batch_dir: &std::path::Path, llm: &Arc<ScriptedLlm>) -> Pipeline {
    let sources: Vec<Box<dyn LiteratureSource>> =
        vec![Box::new(FixedSource { tag: SourceTag::Arxiv, articles: seven_articles() })];
    let checkpointer = BatchCheckpointer::new(batch_dir, 5).unwrap().with_resume(true);
    Pipeline::new(sources, enricher(llm), checkpointer, OntologySchema::default())
}

#[tokio::test]
async fn resume_skips_batches_from_an_earlier_run() {
    let dir = tempfile::tempdir().unwrap();
    let batch_dir = dir.path().join("processed_articles");

    let first_llm = Arc::new(ScriptedLlm::default());
    resuming_pipeline(&batch_dir, &first_llm).run(&job(dir.path()), None).await.unwrap();
    let kept = std::fs::read_to_string(batch_dir.join("articles_1_to_5.json")).unwrap();
    // The final batch is lost, as if the earlier run was interrupted.
    std::fs::remove_file(batch_dir.join("articles_6_to_7.json")).unwrap();

    let llm = Arc::new(ScriptedLlm::default());
    let report = resuming_pipeline(&batch_dir, &llm).run(&job(dir.path()), None).await.unwrap();

    assert_eq!(report.records_resumed, 5);
    assert_eq!(report.records_enriched, 2);
    assert!(report.batches[0].reused);
    assert!(!report.batches[1].reused);
    // Only record 7 has an abstract among 6..7.
    assert_eq!(llm.calls(), 2);
    assert_eq!(std::fs::read_to_string(batch_dir.join("articles_1_to_5.json")).unwrap(), kept);
    assert!(batch_dir.join("articles_6_to_7.json").is_file());
    // The graph still covers every row.
    assert_eq!(report.graph.articles().len(), 7);
}

#[tokio::test]
async fn resume_rewrites_batch_files_that_do_not_match() {
    let dir = tempfile::tempdir().unwrap();
    let batch_dir = dir.path().join("processed_articles");
    std::fs::create_dir_all(&batch_dir).unwrap();
    std::fs::write(batch_dir.join("articles_1_to_5.json"), "[]").unwrap();

    let llm = Arc::new(ScriptedLlm::default());
    let pipeline = resuming_pipeline(&batch_dir, &llm);
    let report = pipeline.run(&job(dir.path()), None).await.unwrap();

    assert_eq!(report.records_resumed, 0);
    assert_eq!(report.records_enriched, 7);
    assert!(report.batches.iter().all(|h| !h.reused));

    let checkpointer = BatchCheckpointer::new(&batch_dir, 5).unwrap();
    let rewritten: Vec<EnrichedRecord> = checkpointer.read_batch(&report.batches[0]).unwrap();
    let titles: Vec<_> = rewritten.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Article 1", "Article 2", "Article 3", "Article 4", "Article 5"]);
}

#[tokio::test]
async fn no_articles_is_nothing_to_process() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let sources: Vec<Box<dyn LiteratureSource>> = vec![Box::new(DownSource(SourceTag::PubMed))];
    let checkpointer = BatchCheckpointer::new(dir.path().join("batches"), 5).unwrap();
    let pipeline = Pipeline::new(sources, enricher(&llm), checkpointer, OntologySchema::default());

    let err = pipeline.run(&job(dir.path()), None).await.unwrap_err();
    assert!(matches!(err, PipelineError::NothingToProcess));
    assert!(!dir.path().join("batches").exists());
    assert!(!dir.path().join("out/graph.ttl").exists());
}

#[tokio::test]
async fn extra_tables_are_harmonized_without_enrichment() {
    let dir = tempfile::tempdir().unwrap();
    let llm = Arc::new(ScriptedLlm::default());
    let checkpointer = BatchCheckpointer::new(dir.path().join("batches"), 5).unwrap();
    let pipeline = Pipeline::new(Vec::new(), enricher(&llm), checkpointer, OntologySchema::default());

    let export = SourceTable::from_objects(
        "export",
        vec![json!({"title": "Loose row", "authors": ["A", "B"], "abstract": "Cancer biology."})
            .as_object()
            .unwrap()
            .clone()],
    );
    let job = PipelineJob { extra_tables: vec![export], ..job(dir.path()) };
    let report = pipeline.run(&job, None).await.unwrap();

    assert_eq!(report.articles_found, 0);
    assert!(report.batches.is_empty());
    assert_eq!(llm.calls(), 0);
    assert_eq!(report.table.rows()[0].author, FieldValue::List(vec!["A".into(), "B".into()]));
    assert_eq!(report.graph.articles().len(), 1);
}
