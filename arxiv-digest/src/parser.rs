use crate::types::{DigestError, PaperRecord, PublishedAt, Result};
use feed_rs::model::Entry;
use feed_rs::parser;
use std::collections::HashSet;
use tracing::{debug, info};

const PUBLISHED_OPEN: &str = "<published>";
const PUBLISHED_CLOSE: &str = "</published>";

/// Turns arXiv Atom listings into `PaperRecord`s.
///
/// The feed-rs parser holds non-`Send` closures, so one is built per document
/// instead of being stored here.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed(&self, content: &str) -> Result<Vec<PaperRecord>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        // feed-rs invents an id for entries that lack one; leave it empty so
        // such entries can be recognised and dropped.
        let feed = parser::Builder::new()
            .id_generator(|_, _, _| String::new())
            .build()
            .parse(content.as_bytes())
            .map_err(|e| DigestError::Parse(format!("Failed to parse feed: {}", e)))?;

        let total = feed.entries.len();
        let mut raw_published = raw_published_by_entry(content);
        if raw_published.len() != total {
            debug!("Cannot align raw <published> values with entries, ignoring them");
            raw_published.clear();
        }
        raw_published.resize(total, None);

        let papers: Vec<PaperRecord> = feed
            .entries
            .into_iter()
            .zip(raw_published)
            .filter_map(|(entry, raw)| parse_entry(entry, raw))
            .collect();

        if papers.len() < total {
            debug!("Dropped {} entries without a usable identifier", total - papers.len());
        }
        info!("Parsed feed with {} entries", papers.len());
        Ok(papers)
    }
}

/// Raw `<published>` text of every `<entry>`, in document order. feed-rs drops
/// values it cannot parse as a date; these keep them for display.
fn raw_published_by_entry(content: &str) -> Vec<Option<String>> {
    content
        .split("<entry>")
        .skip(1)
        .map(|block| {
            let block = block.split("</entry>").next().unwrap_or(block);
            let start = block.find(PUBLISHED_OPEN)? + PUBLISHED_OPEN.len();
            let len = block[start..].find(PUBLISHED_CLOSE)?;
            Some(block[start..start + len].trim().to_string()).filter(|raw| !raw.is_empty())
        })
        .collect()
}

fn parse_entry(entry: Entry, raw_published: Option<String>) -> Option<PaperRecord> {
    let id = arxiv_id(&entry.id)?;

    let title = entry
        .title
        .map(|t| collapse_whitespace(&t.content))
        .unwrap_or_default();

    let abstract_text = entry
        .summary
        .map(|s| collapse_whitespace(&s.content))
        .unwrap_or_default();

    let authors = entry.authors.into_iter().map(|a| a.name).collect();

    let published = match (entry.published, raw_published, entry.updated) {
        (Some(ts), _, _) => PublishedAt::from(ts),
        (None, Some(raw), _) => PublishedAt::parse(&raw),
        (None, None, Some(updated)) => PublishedAt::from(updated),
        (None, None, None) => PublishedAt::Raw(String::new()),
    };

    let link = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| entry.links.first())
        .map(|l| l.href.clone())
        .unwrap_or_default();

    let categories = entry.categories.into_iter().map(|c| c.term).collect();

    Some(PaperRecord {
        id,
        title,
        authors,
        abstract_text,
        published,
        link,
        categories,
    })
}

/// `http://arxiv.org/abs/2401.01234v1` -> `2401.01234v1`
fn arxiv_id(raw: &str) -> Option<String> {
    let id = raw.trim().trim_end_matches('/').rsplit('/').next()?.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep the first occurrence of every id, preserving order.
pub fn deduplicate_papers(papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut seen_ids = HashSet::new();
    let before = papers.len();

    let unique: Vec<PaperRecord> = papers
        .into_iter()
        .filter(|paper| seen_ids.insert(paper.id.clone()))
        .collect();

    let removed_count = before - unique.len();
    if removed_count > 0 {
        debug!("Removed {} duplicate papers", removed_count);
    }
    unique
}
