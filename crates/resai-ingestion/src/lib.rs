//! resai-ingestion
//! Literature search, harmonization, enrichment and batch checkpointing.

pub mod checkpoint;
pub mod extraction;
pub mod models;
pub mod normalise;
pub mod ocr;
pub mod pipeline;
pub mod sources;

pub use checkpoint::{Batch, BatchAccumulator, BatchCheckpointer, BatchHandle, BatchSpan, CheckpointError};
pub use extraction::{extract_key_information, KeyInformation};
pub use models::{ArticleRecord, CitationInfo, EnrichedRecord, SourceRow, SourceTable, SourceTag};
pub use normalise::{harmonize, load_json_table, write_table_json};
pub use ocr::{TesseractCli, TextExtractor};
pub use pipeline::{
    OcrText, Pipeline, PipelineError, PipelineJob, PipelineProgress, PipelineReport, PipelineState, DEFAULT_KEYWORDS,
};
pub use sources::{search_academic_sources, LiteratureSource, QueryPlan, SearchFailure, SourceError};
