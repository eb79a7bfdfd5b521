pub mod types;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod filter;
pub mod summarizer;
pub mod digest;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod scheduler;

pub use types::*;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sources::ArxivFeedSource;
pub use filter::{FilterResult, RelevanceFilter};
pub use summarizer::{SummarizerConfig, SynopsisGenerator};
pub use digest::DigestEntry;
pub use config::{AppConfig, DigestSettings};
pub use pipeline::{DigestPipeline, RunReport};
