use crate::types::{DigestError, FetchConfig, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Thin HTTP client for the arXiv listing API.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Query URL for the newest `max_results` submissions in `category`.
    pub fn query_url(&self, category: &str, max_results: usize) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)?;
        url.query_pairs_mut()
            .append_pair("search_query", &format!("cat:{}", category))
            .append_pair("start", "0")
            .append_pair("max_results", &max_results.to_string())
            .append_pair("sortBy", "submittedDate")
            .append_pair("sortOrder", "descending");
        Ok(url)
    }

    /// Fetch the raw Atom document for one category.
    pub async fn fetch_category(&self, category: &str, max_results: usize) -> Result<String> {
        let url = self.query_url(category, max_results)?;
        let start_time = Instant::now();

        debug!(%url, "Querying listing API");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(DigestError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let content = response.text().await?;
        info!(
            category,
            bytes = content.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Fetched listing"
        );
        Ok(content)
    }
}
