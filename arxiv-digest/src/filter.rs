//! Keyword relevance scoring.
//!
//! Every paper is scored against every group independently. A term found in
//! the title earns 3 points, a term found only in the abstract earns 1. Any
//! exclude term anywhere in the title or abstract rejects the paper for that
//! group alone.

use crate::types::{Annotation, GlobalKeywordSet, KeywordGroup, PaperRecord, ScoredPaper};
use std::collections::HashSet;
use tracing::{debug, info};

pub const TITLE_MATCH_POINTS: u32 = 3;
pub const ABSTRACT_MATCH_POINTS: u32 = 1;
pub const DEFAULT_MIN_SCORE: u32 = 1;

/// Ranked matches for one group, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMatches {
    pub name: String,
    pub matches: Vec<ScoredPaper>,
}

/// Group name -> ranked matches, in configuration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterResult {
    pub groups: Vec<GroupMatches>,
}

impl FilterResult {
    pub fn get(&self, name: &str) -> Option<&[ScoredPaper]> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.matches.as_slice())
    }

    pub fn total_matches(&self) -> usize {
        self.groups.iter().map(|g| g.matches.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_matches() == 0
    }
}

pub struct RelevanceFilter {
    min_score: u32,
}

impl RelevanceFilter {
    pub fn new(min_score: u32) -> Self {
        Self { min_score }
    }

    pub fn filter(&self, papers: &[PaperRecord], groups: &[KeywordGroup], global: &GlobalKeywordSet) -> FilterResult {
        let groups = groups
            .iter()
            .map(|group| {
                let matches = self.rank_group(papers, group, global);
                info!(group = %group.name, matched = matches.len(), "Group filtered");
                GroupMatches {
                    name: group.name.clone(),
                    matches,
                }
            })
            .collect();

        FilterResult { groups }
    }

    fn rank_group(&self, papers: &[PaperRecord], group: &KeywordGroup, global: &GlobalKeywordSet) -> Vec<ScoredPaper> {
        let terms = GroupTerms::new(group, global);

        let mut matches: Vec<ScoredPaper> = papers
            .iter()
            .filter_map(|paper| {
                let annotation = terms.score(paper)?;
                if annotation.relevance_score >= self.min_score && annotation.relevance_score > 0 {
                    Some(ScoredPaper {
                        paper: paper.clone(),
                        annotation,
                    })
                } else {
                    None
                }
            })
            .collect();

        // sort_by is stable: equal scores keep fetch order.
        matches.sort_by(|a, b| b.annotation.relevance_score.cmp(&a.annotation.relevance_score));
        matches
    }
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SCORE)
    }
}

/// Effective term lists of one group: group terms first, then global terms.
/// Blank terms are skipped and repeats (ignoring case) collapse to the first.
struct GroupTerms {
    include: Vec<(String, String)>,
    exclude: Vec<String>,
}

impl GroupTerms {
    fn new(group: &KeywordGroup, global: &GlobalKeywordSet) -> Self {
        let include = merge_terms(&group.include, &global.include)
            .map(|term| (term.to_lowercase(), term.to_string()))
            .collect();
        let exclude = merge_terms(&group.exclude, &global.exclude)
            .map(str::to_lowercase)
            .collect();
        Self { include, exclude }
    }

    /// `None` when an exclude term is present; otherwise the (possibly zero)
    /// score and the include terms that matched, in term order.
    fn score(&self, paper: &PaperRecord) -> Option<Annotation> {
        let title = paper.title.to_lowercase();
        let haystack = format!("{} {}", title, paper.abstract_text.to_lowercase());

        if let Some(term) = self.exclude.iter().find(|term| haystack.contains(term.as_str())) {
            debug!(paper = %paper.id, term = %term, "Excluded");
            return None;
        }

        let mut annotation = Annotation::default();
        for (needle, original) in &self.include {
            if !haystack.contains(needle.as_str()) {
                continue;
            }
            annotation.relevance_score += if title.contains(needle.as_str()) {
                TITLE_MATCH_POINTS
            } else {
                ABSTRACT_MATCH_POINTS
            };
            annotation.matched_keywords.push(original.clone());
        }
        Some(annotation)
    }
}

fn merge_terms<'a>(first: &'a [String], second: &'a [String]) -> impl Iterator<Item = &'a str> {
    let mut seen = HashSet::new();
    first
        .iter()
        .chain(second.iter())
        .map(|term| term.trim())
        .filter(|term| !term.is_empty())
        .filter(move |term| seen.insert(term.to_lowercase()))
}
