pub mod defs;

pub use defs::Annotation;
pub use defs::GlobalKeywordSet;
pub use defs::KeywordGroup;
pub use defs::Mailer;
pub use defs::PaperRecord;
pub use defs::PaperSource;
pub use defs::PublishedAt;
pub use defs::ScoredPaper;
pub use defs::Synopsis;

#[cfg(test)]
mod tests {
    use crate::defs::KeywordGroup;
    use crate::defs::PublishedAt;

    #[test]
    fn published_at_parses_rfc3339() {
        let published = PublishedAt::parse("2024-01-15T18:00:00Z");
        let ts = published.timestamp().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-15T18:00:00+00:00");
    }

    #[test]
    fn published_at_keeps_unparseable_text() {
        let published = PublishedAt::parse(" last tuesday ");
        assert_eq!(published, PublishedAt::Raw("last tuesday".to_owned()));
        assert!(published.timestamp().is_none());
    }

    #[test]
    fn keyword_group_exclude_defaults_to_empty() {
        let group: KeywordGroup = serde_json::from_str(r#"{"name":"dllm","include":["diffusion"]}"#).unwrap();
        assert_eq!(group.include, vec!["diffusion".to_owned()]);
        assert!(group.exclude.is_empty());
    }
}
