//! Configuration loading for ResearchAssistAI.
//! Reads resai.toml from the current directory or path in RESAI_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use resai_ingestion::DEFAULT_KEYWORDS;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub ontology: OntologyConfig,
    #[serde(default)]
    pub harmonize: HarmonizeConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_rps")]
    pub requests_per_second: f64,
    #[serde(default = "default_source_pause_ms")]
    pub source_pause_ms: u64,
    pub pubmed_api_key: Option<String>,
    pub crossref_mailto: Option<String>,
}

fn default_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}
fn default_max_results()     -> usize { 5 }
fn default_sources() -> Vec<String> {
    vec!["pubmed".to_string(), "arxiv".to_string(), "crossref".to_string()]
}
fn default_rps()             -> f64 { 2.0 }
fn default_source_pause_ms() -> u64 { 1000 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            max_results: default_max_results(),
            sources: default_sources(),
            requests_per_second: default_rps(),
            source_pause_ms: default_source_pause_ms(),
            pubmed_api_key: None,
            crossref_mailto: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `ollama` or `openai_compatible`.
    #[serde(default = "default_llm_backend")]
    pub backend: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    pub api_key: Option<String>,
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,
    #[serde(default = "default_description_temperature")]
    pub description_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_summary_top_p")]
    pub top_p: f32,
}

fn default_llm_backend()             -> String { "ollama".to_string() }
fn default_llm_base_url()            -> String { "http://localhost:11434".to_string() }
fn default_llm_model()               -> String { "llama3:8b".to_string() }
fn default_summary_temperature()     -> f32 { 0.2 }
fn default_description_temperature() -> f32 { 0.3 }
fn default_max_tokens()              -> u32 { 512 }
fn default_summary_top_p()           -> f32 { 0.5 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: default_llm_backend(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            summary_temperature: default_summary_temperature(),
            description_temperature: default_description_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_summary_top_p(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 { 2 }

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self { max_attempts: default_max_attempts() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub resume: bool,
}

fn default_checkpoint_dir() -> PathBuf { PathBuf::from("processed_articles") }
fn default_batch_size()     -> usize { 5 }

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self { dir: default_checkpoint_dir(), batch_size: default_batch_size(), resume: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OntologyConfig {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_bio_namespace")]
    pub bio_namespace: String,
    #[serde(default = "default_links")]
    pub links: Vec<LinkConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub trigger: String,
    pub concept: String,
}

fn default_namespace()     -> String { resai_kg::RESAI_NS.to_string() }
fn default_bio_namespace() -> String { resai_kg::BIO_NS.to_string() }
fn default_links() -> Vec<LinkConfig> {
    vec![LinkConfig { trigger: "cancer".to_string(), concept: "Cancer".to_string() }]
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            bio_namespace: default_bio_namespace(),
            links: default_links(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarmonizeConfig {
    /// Exported JSON tables merged with the search results.
    #[serde(default)]
    pub extra_tables: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_tesseract_bin")]
    pub tesseract_bin: PathBuf,
    pub language: Option<String>,
    #[serde(default)]
    pub images: Vec<PathBuf>,
}

fn default_tesseract_bin() -> PathBuf { PathBuf::from("tesseract") }

impl Default for OcrConfig {
    fn default() -> Self {
        Self { tesseract_bin: default_tesseract_bin(), language: None, images: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_turtle_path")]
    pub turtle_path: Option<PathBuf>,
    #[serde(default = "default_harmonized_path")]
    pub harmonized_path: Option<PathBuf>,
}

fn default_turtle_path()     -> Option<PathBuf> { Some(PathBuf::from("articles.ttl")) }
fn default_harmonized_path() -> Option<PathBuf> { Some(PathBuf::from("harmonized_articles.json")) }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { turtle_path: default_turtle_path(), harmonized_path: default_harmonized_path() }
    }
}


impl Config {
    /// Load configuration from resai.toml.
    /// Checks RESAI_CONFIG env var first, then current directory.
    /// Returns `Ok(None)` when no file exists.
    pub fn load() -> anyhow::Result<Option<Self>> {
        let path = std::env::var("RESAI_CONFIG")
            .unwrap_or_else(|_| "resai.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(Self::parse(&content)?))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.checkpoint.batch_size == 0 {
            anyhow::bail!("checkpoint.batch_size must be at least 1");
        }
        Ok(config)
    }
}
