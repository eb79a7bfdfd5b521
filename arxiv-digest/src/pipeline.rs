use crate::config::DigestSettings;
use crate::digest::{self, DigestEntry};
use crate::filter::{FilterResult, RelevanceFilter};
use crate::summarizer::SynopsisGenerator;
use crate::types::{DigestError, Mailer, PaperRecord, PaperSource, Result};
use chrono::{DateTime, Duration, Local, Utc};
use email_delivery::{deliver, DeliveryReport};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// What one run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub fetched: usize,
    pub recent: usize,
    pub matched: usize,
    pub pushed: usize,
    pub delivery: DeliveryReport,
}

/// Fetch, filter, summarize, render and send one daily digest.
pub struct DigestPipeline {
    source: Box<dyn PaperSource>,
    filter: RelevanceFilter,
    summarizer: SynopsisGenerator,
    mailer: Box<dyn Mailer>,
    settings: DigestSettings,
    recipients: Vec<String>,
}

impl DigestPipeline {
    pub fn new(
        source: Box<dyn PaperSource>,
        summarizer: SynopsisGenerator,
        mailer: Box<dyn Mailer>,
        settings: DigestSettings,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            source,
            filter: RelevanceFilter::new(settings.min_score),
            summarizer,
            mailer,
            settings,
            recipients,
        }
    }

    /// Run once. Only a delivery that reached nobody is an error; empty fetches
    /// and empty matches still send a "no papers" digest.
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("digest_run", run_id = %run_id);
        self.run_inner(run_id, Utc::now(), Local::now().date_naive())
            .instrument(span)
            .await
    }

    async fn run_inner(&self, run_id: Uuid, now: DateTime<Utc>, today: chrono::NaiveDate) -> Result<RunReport> {
        let settings = &self.settings;
        info!("Starting digest run");

        let papers = self
            .source
            .fetch(&settings.categories, settings.max_per_category, settings.days_back)
            .await;
        let fetched = papers.len();
        if fetched == 0 {
            warn!("No papers fetched");
        }

        let papers = filter_recent(papers, settings.days_back, now);
        let recent = papers.len();
        if recent < fetched {
            info!(dropped = fetched - recent, days_back = settings.days_back, "Dropped papers outside the recency window");
        }

        let result = self.filter.filter(&papers, &settings.groups, &settings.global);
        let matched = result.total_matches();
        if fetched > 0 && result.is_empty() {
            warn!("No papers matched any keyword group");
        }

        let (sections, pushed) = self.render_sections(&result).await;

        let body = digest::render_email(today, &sections, pushed);
        let subject = digest::subject(&settings.subject_prefix, today, pushed);
        let delivery = deliver(self.mailer.as_ref(), &self.recipients, &subject, &body).await;

        if !delivery.is_success() {
            error!("Digest reached no recipients");
            return Err(DigestError::Delivery(format!(
                "0/{} recipients reached",
                delivery.attempted()
            )));
        }

        info!(fetched, recent, matched, pushed, "Digest run finished");
        Ok(RunReport {
            run_id,
            fetched,
            recent,
            matched,
            pushed,
            delivery,
        })
    }

    /// Summarize only the papers that will be shown, then render each group.
    async fn render_sections(&self, result: &FilterResult) -> (Vec<String>, usize) {
        let cap = self.settings.max_papers_per_group;
        let mut sections = Vec::with_capacity(result.groups.len());
        let mut pushed = 0;

        for group in &result.groups {
            let mut entries = Vec::with_capacity(group.matches.len());
            for (rank, scored) in group.matches.iter().enumerate() {
                let synopsis = if rank < cap {
                    Some(
                        self.summarizer
                            .summarize(&scored.paper.title, &scored.paper.abstract_text)
                            .await,
                    )
                } else {
                    None
                };
                entries.push(DigestEntry {
                    paper: scored.paper.clone(),
                    annotation: scored.annotation.clone(),
                    synopsis,
                });
            }

            pushed += entries.len().min(cap);
            sections.push(digest::render(&group.name, &entries, cap));
        }

        (sections, pushed)
    }
}

/// Drop papers published before `now - days_back`. Unparsed timestamps are
/// kept; `days_back == 0` keeps everything.
pub fn filter_recent(papers: Vec<PaperRecord>, days_back: u32, now: DateTime<Utc>) -> Vec<PaperRecord> {
    if days_back == 0 {
        return papers;
    }
    let Some(cutoff) = now.checked_sub_signed(Duration::days(i64::from(days_back))) else {
        return papers;
    };
    papers
        .into_iter()
        .filter(|paper| paper.published.timestamp().map_or(true, |ts| ts >= cutoff))
        .collect()
}
