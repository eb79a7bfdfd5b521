use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// When a paper was published, as reported by the listing feed.
///
/// Feeds normally carry an RFC 3339 timestamp, but the raw text is kept when it
/// does not parse so it can still be shown to the reader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PublishedAt {
    Timestamp(DateTime<FixedOffset>),
    Raw(String),
}

impl PublishedAt {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match DateTime::parse_from_rfc3339(trimmed) {
            Ok(ts) => PublishedAt::Timestamp(ts),
            Err(_) => PublishedAt::Raw(trimmed.to_owned()),
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            PublishedAt::Timestamp(ts) => Some(ts.with_timezone(&Utc)),
            PublishedAt::Raw(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for PublishedAt {
    fn from(ts: DateTime<Utc>) -> Self {
        PublishedAt::Timestamp(ts.fixed_offset())
    }
}

/// A paper as fetched from the listing feed. Identity is `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub published: PublishedAt,
    pub link: String,
    pub categories: Vec<String>,
}

/// Per-group scoring result. Never shared between groups.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub relevance_score: u32,
    pub matched_keywords: Vec<String>,
}

/// A paper together with the annotation it earned inside one group.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredPaper {
    pub paper: PaperRecord,
    pub annotation: Annotation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub name: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl KeywordGroup {
    pub fn new(name: impl Into<String>, include: &[&str], exclude: &[&str]) -> Self {
        Self {
            name: name.into(),
            include: include.iter().map(|t| t.to_string()).collect(),
            exclude: exclude.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Terms unioned into every group's include and exclude lists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalKeywordSet {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Synopsis {
    pub core_problem: String,
    pub key_approach: String,
    pub main_conclusion: String,
    /// Set only when a remote call was attempted and failed.
    pub degraded: bool,
}

// Object style note:
// Implementations of these traits sit at the process boundary (HTTP, SMTP).
// Everything between them is plain synchronous data transformation, so tests
// swap these out for in-memory fakes.

#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Fetch the most recent papers for each category, de-duplicated by id.
    /// Failures of individual categories are contained by the implementation.
    async fn fetch(&self, categories: &[String], max_per_category: usize, days_back: u32) -> Vec<PaperRecord>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one plaintext message to one recipient.
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}
