use crate::pipeline::DigestPipeline;
use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};
use std::future::Future;
use tracing::{error, info, warn};

/// First occurrence of `at` strictly after `now`, in `now`'s time zone.
/// Skips forward a day when the wall-clock time does not exist (DST gap).
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let mut date = now.date_naive();
    for _ in 0..3 {
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(at)).earliest() {
            if candidate > *now {
                return Some(candidate);
            }
        }
        date = date.checked_add_days(Days::new(1))?;
    }
    None
}

/// Run the pipeline every day at `at` local time until `shutdown` resolves.
/// A failed run is logged and the schedule continues. Shutdown also abandons a
/// run in progress.
pub async fn run_daily<F>(pipeline: &DigestPipeline, at: NaiveTime, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let now = Local::now();
        let Some(next) = next_run_after(&now, at) else {
            error!(time = %at, "Cannot compute next run time, stopping scheduler");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_run = %next.format("%Y-%m-%d %H:%M:%S"), "Waiting for next scheduled run");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = &mut shutdown => {
                info!("Scheduler stopped");
                return;
            }
        }

        tokio::select! {
            result = pipeline.run() => match result {
                Ok(report) => info!(run_id = %report.run_id, pushed = report.pushed, "Scheduled run finished"),
                Err(e) => warn!(error = %e, "Scheduled run failed"),
            },
            _ = &mut shutdown => {
                warn!("Scheduler stopped during a run, digest not sent");
                return;
            }
        }
    }
}
