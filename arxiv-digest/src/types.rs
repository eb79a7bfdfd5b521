use serde::{Deserialize, Serialize};
// Use the interfaces crate for core types
pub use interfaces::defs::{Annotation, GlobalKeywordSet, KeywordGroup, PaperRecord, PublishedAt, ScoredPaper, Synopsis};
pub use interfaces::defs::{Mailer, PaperSource};

pub const DEFAULT_ARXIV_API: &str = "http://export.arxiv.org/api/query";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// Pause between successive category queries, as a courtesy to the API.
    pub request_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ARXIV_API.to_string(),
            user_agent: format!("arxiv-digest/{}", env!("CARGO_PKG_VERSION")),
            timeout_seconds: 30,
            request_delay_ms: 1000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, DigestError>;
