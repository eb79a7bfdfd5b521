use crate::types::{Annotation, PaperRecord, PublishedAt, Synopsis};
use chrono::NaiveDate;

const PUBLISHED_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// One ranked paper of a group, with its synopsis once one has been produced.
#[derive(Debug, Clone)]
pub struct DigestEntry {
    pub paper: PaperRecord,
    pub annotation: Annotation,
    pub synopsis: Option<Synopsis>,
}

/// Render one group's ranked papers, keeping at most `cap` of them.
pub fn render(group_name: &str, ranked: &[DigestEntry], cap: usize) -> String {
    let shown = &ranked[..ranked.len().min(cap)];
    let mut parts = vec![format!("===== {} | {} papers =====", group_name, shown.len())];

    if shown.is_empty() {
        parts.push("No matching papers today.".to_string());
    }

    for (i, entry) in shown.iter().enumerate() {
        parts.push(String::new());
        parts.push(format!("=== Pick #{}/{} ===", i + 1, shown.len()));
        parts.extend(render_entry(entry));
    }

    parts.push(String::new());
    parts.push("[ℹ️ Status]".to_string());
    parts.push(format!("Candidates matched: {}", ranked.len()));
    if let Some((keyword, count)) = top_keyword(shown) {
        parts.push(format!("Most frequent keyword: 【{}】 ({} of {})", keyword, count, shown.len()));
    }
    parts.push(format!("Pushed: {}", shown.len()));

    parts.join("\n")
}

fn render_entry(entry: &DigestEntry) -> Vec<String> {
    let paper = &entry.paper;
    let mut lines = vec![format!("📄 Title: {}", paper.title)];

    if !paper.authors.is_empty() {
        lines.push(format!("👥 Authors: {}", paper.authors.join(", ")));
    }
    if !paper.abstract_text.is_empty() {
        lines.push(format!("📝 Abstract:\n{}", paper.abstract_text));
    }

    if let Some(synopsis) = &entry.synopsis {
        if synopsis.degraded {
            lines.push("⚠️ AI summary unavailable, extracted from the abstract instead".to_string());
        }
        if !synopsis.core_problem.is_empty() {
            lines.push(format!("🎯 Core problem:\n{}", synopsis.core_problem));
        }
        if !synopsis.key_approach.is_empty() {
            lines.push(format!("💡 Key approach:\n{}", synopsis.key_approach));
        }
        if !synopsis.main_conclusion.is_empty() {
            lines.push(format!("✨ Main conclusion:\n{}", synopsis.main_conclusion));
        }
    }

    if let Some(published) = format_published(&paper.published) {
        lines.push(format!("📅 Published: {}", published));
    }
    if !paper.link.is_empty() {
        lines.push(format!("🔗 arXiv link:\n{}", paper.link));
    }
    lines.push(format!(
        "🏷️ Score {} via {}",
        entry.annotation.relevance_score,
        entry.annotation.matched_keywords.join(", ")
    ));
    lines
}

/// Fixed human-readable form, the raw text when it did not parse, `None` when
/// there is nothing to show.
pub fn format_published(published: &PublishedAt) -> Option<String> {
    match published {
        PublishedAt::Timestamp(ts) => Some(ts.format(PUBLISHED_FORMAT).to_string()),
        PublishedAt::Raw(raw) if raw.is_empty() => None,
        PublishedAt::Raw(raw) => Some(raw.clone()),
    }
}

/// Keyword matched by the most entries; ties go to the first one encountered.
pub fn top_keyword(entries: &[DigestEntry]) -> Option<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for keyword in entries.iter().flat_map(|e| e.annotation.matched_keywords.iter()) {
        match counts.iter_mut().find(|(k, _)| *k == keyword.as_str()) {
            Some((_, count)) => *count += 1,
            None => counts.push((keyword.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (keyword, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((keyword, count));
        }
    }
    best
}

/// Full message body: a dated header followed by every group section.
pub fn render_email(date: NaiveDate, sections: &[String], pushed: usize) -> String {
    let date_str = date.format("%Y-%m-%d");
    if pushed == 0 {
        return format!(
            "{} arXiv daily picks\n\nNo papers found today that match your keyword groups.",
            date_str
        );
    }

    let mut body = format!("{} arXiv daily picks, {} papers in total\n", date_str, pushed);
    for section in sections {
        body.push('\n');
        body.push_str(section);
        body.push('\n');
    }
    body
}

pub fn subject(prefix: &str, date: NaiveDate, pushed: usize) -> String {
    let subject = format!("{} daily picks #{}", date.format("%Y-%m-%d"), pushed);
    if prefix.is_empty() {
        subject
    } else {
        format!("{} {}", prefix, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(id: &str, keywords: &[&str], synopsis: Option<Synopsis>) -> DigestEntry {
        DigestEntry {
            paper: PaperRecord {
                id: id.to_string(),
                title: format!("Paper {}", id),
                authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
                abstract_text: "An abstract.".to_string(),
                published: PublishedAt::from(Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap()),
                link: format!("http://arxiv.org/abs/{}", id),
                categories: vec!["cs.CL".to_string()],
            },
            annotation: Annotation {
                relevance_score: keywords.len() as u32,
                matched_keywords: keywords.iter().map(|k| k.to_string()).collect(),
            },
            synopsis,
        }
    }

    #[test]
    fn render_truncates_to_cap_and_reports_totals() {
        let ranked = vec![
            entry("1", &["diffusion"], None),
            entry("2", &["dllm"], None),
            entry("3", &["diffusion"], None),
        ];
        let text = render("dllm", &ranked, 2);

        assert!(text.starts_with("===== dllm | 2 papers ====="));
        assert!(text.contains("Paper 1"));
        assert!(text.contains("Paper 2"));
        assert!(!text.contains("Paper 3"));
        assert!(text.contains("Candidates matched: 3"));
        assert!(text.contains("Pushed: 2"));
        // counted over the rendered papers only: one each, first wins
        assert!(text.contains("【diffusion】 (1 of 2)"));
    }

    #[test]
    fn render_shows_only_non_empty_synopsis_fields() {
        let synopsis = Synopsis {
            core_problem: "Slow decoding".to_string(),
            key_approach: String::new(),
            main_conclusion: "3x faster".to_string(),
            degraded: false,
        };
        let text = render("dllm", &[entry("1", &["diffusion"], Some(synopsis))], 5);

        assert!(text.contains("🎯 Core problem:\nSlow decoding"));
        assert!(!text.contains("Key approach"));
        assert!(text.contains("✨ Main conclusion:\n3x faster"));
        assert!(!text.contains("AI summary unavailable"));
        assert!(text.contains("📅 Published: Mon, 15 Jan 2024 18:00:00 +0000"));
        assert!(text.contains("🔗 arXiv link:\nhttp://arxiv.org/abs/1"));
    }

    #[test]
    fn render_flags_degraded_synopsis() {
        let synopsis = Synopsis {
            core_problem: "A".to_string(),
            key_approach: "B".to_string(),
            main_conclusion: "C".to_string(),
            degraded: true,
        };
        let text = render("dllm", &[entry("1", &["diffusion"], Some(synopsis))], 5);
        assert!(text.contains("AI summary unavailable"));
    }

    #[test]
    fn render_empty_group() {
        let text = render("video understanding", &[], 5);
        assert!(text.contains("0 papers"));
        assert!(text.contains("No matching papers today."));
        assert!(text.contains("Candidates matched: 0"));
        assert!(!text.contains("Most frequent keyword"));
    }

    #[test]
    fn top_keyword_counts_and_breaks_ties_by_first_seen() {
        let entries = vec![
            entry("1", &["video", "vlm"], None),
            entry("2", &["vlm"], None),
            entry("3", &["video"], None),
        ];
        assert_eq!(top_keyword(&entries), Some(("video", 2)));

        let entries = vec![entry("1", &["video", "vlm"], None), entry("2", &["vlm"], None)];
        assert_eq!(top_keyword(&entries), Some(("vlm", 2)));

        assert_eq!(top_keyword(&[]), None);
    }

    #[test]
    fn published_falls_back_to_raw_text() {
        assert_eq!(
            format_published(&PublishedAt::Raw("sometime in 2024".to_string())),
            Some("sometime in 2024".to_string())
        );
        assert_eq!(format_published(&PublishedAt::Raw(String::new())), None);
    }

    #[test]
    fn email_body_and_subject() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let body = render_email(date, &["section one".to_string(), "section two".to_string()], 3);
        assert!(body.starts_with("2024-01-16 arXiv daily picks, 3 papers in total"));
        assert!(body.contains("section one"));
        assert!(body.contains("section two"));

        let empty = render_email(date, &[], 0);
        assert!(empty.contains("No papers found today"));

        assert_eq!(subject("[arXiv]", date, 3), "[arXiv] 2024-01-16 daily picks #3");
        assert_eq!(subject("", date, 0), "2024-01-16 daily picks #0");
    }
}
