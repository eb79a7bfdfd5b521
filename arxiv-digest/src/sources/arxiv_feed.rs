use crate::parser::{deduplicate_papers, FeedParser};
use crate::types::{FetchConfig, PaperRecord, PaperSource, Result};
use crate::Fetcher;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

/// arXiv listing API as a `PaperSource`: one query per category, in order.
pub struct ArxivFeedSource {
    fetcher: Fetcher,
    parser: FeedParser,
}

impl ArxivFeedSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
            parser: FeedParser::new(),
        })
    }

    async fn fetch_one(&self, category: &str, max_per_category: usize) -> Result<Vec<PaperRecord>> {
        let content = self.fetcher.fetch_category(category, max_per_category).await?;
        self.parser.parse_feed(&content)
    }
}

#[async_trait]
impl PaperSource for ArxivFeedSource {
    async fn fetch(&self, categories: &[String], max_per_category: usize, days_back: u32) -> Vec<PaperRecord> {
        let delay = Duration::from_millis(self.fetcher.config().request_delay_ms);
        let total_categories = categories.len();
        let mut all_papers = Vec::new();
        let mut failed_categories = Vec::new();

        for (idx, category) in categories.iter().enumerate() {
            if idx > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            info!(
                category = %category,
                progress = %format!("{}/{}", idx + 1, total_categories),
                days_back,
                "Fetching category"
            );

            match self.fetch_one(category, max_per_category).await {
                Ok(papers) => {
                    info!(category = %category, count = papers.len(), "Category fetched");
                    all_papers.extend(papers);
                }
                Err(e) => {
                    error!(category = %category, error = %e, "Category fetch failed");
                    failed_categories.push(category.as_str());
                }
            }
        }

        if !failed_categories.is_empty() {
            warn!(
                "{} categories failed: {}",
                failed_categories.len(),
                failed_categories.join(", ")
            );
        }

        let unique = deduplicate_papers(all_papers);
        info!(count = unique.len(), "Fetched unique papers");
        unique
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_fits_the_shared_trait_object() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ArxivFeedSource>();

        let source: Box<dyn PaperSource> = Box::new(ArxivFeedSource::new(FetchConfig::default()).unwrap());
        drop(source);
    }
}
