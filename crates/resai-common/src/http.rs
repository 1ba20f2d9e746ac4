use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::error::ResaiError;

const USER_AGENT: &str = "ResearchAssist/0.1 (scholarly metadata harvester)";

/// An HTTP client that only talks to approved domains and keeps every
/// request at least `1 / requests_per_second` apart.
///
/// Clones share the same rate window, so handing a clone to each search
/// source still respects a single global budget.
#[derive(Debug, Clone)]
pub struct PoliteClient {
    client: Client,
    allowlist: HashSet<String>,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl PoliteClient {
    /// Creates a client with the default allowlist of search and language-model hosts.
    pub fn new(requests_per_second: f64) -> Result<Self, ResaiError> {
        let domains = [
            "eutils.ncbi.nlm.nih.gov", // PubMed
            "pubmed.ncbi.nlm.nih.gov", // PubMed article pages
            "export.arxiv.org",        // arXiv
            "api.crossref.org",        // CrossRef
            "localhost",               // Ollama local
            "127.0.0.1",               // Localhost alt
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        let min_interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };

        Ok(Self {
            client,
            allowlist,
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Validates if a URL is permitted under the current allowlist.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{allowed}")))
    }

    /// Waits for the next rate slot and returns a GET builder for `url`.
    pub async fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, ResaiError> {
        if !self.is_allowed(url) {
            return Err(ResaiError::SecurityError(format!(
                "domain not in allowlist for URL {url}"
            )));
        }
        self.throttle().await;
        Ok(self.client.get(url))
    }

    /// Sleeps until `min_interval` has passed since the previous request.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "Rate limiting");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}
