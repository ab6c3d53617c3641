//! The scrape trigger: fetch the listing, reconcile it and report what changed.

mod watch;

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;

use crate::{
    db::{format_date, format_time, Database, NewSyncRun},
    reconcile::{self, CountChange, ReconcileReport, Removal, SeminarStore, SqliteSeminarStore},
    scraper::{Credentials, HttpListingSource, ListingSource, ScrapeOutcome},
    AppState,
};

pub use watch::{watch_loop, WatchSummary};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddedSeminar {
    pub date: String,
    pub time: String,
    pub participants: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedSeminar {
    pub date: String,
    pub time: String,
    pub old_participants: u32,
    pub new_participants: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedSeminar {
    pub date: String,
    pub time: String,
}

/// Result of one trigger, as printed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub added: Vec<AddedSeminar>,
    pub updated: Vec<UpdatedSeminar>,
    pub removed: Vec<RemovedSeminar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            error: Some(message.into()),
        }
    }

    fn from_report(report: ReconcileReport) -> Self {
        Self {
            success: true,
            added: report
                .added
                .iter()
                .map(|seminar| AddedSeminar {
                    date: format_date(seminar.date),
                    time: format_time(seminar.time),
                    participants: seminar.participant_count,
                })
                .collect(),
            updated: report.updated.iter().map(updated_entry).collect(),
            removed: report.removed.iter().map(removed_entry).collect(),
            error: None,
        }
    }
}

fn updated_entry(change: &CountChange) -> UpdatedSeminar {
    UpdatedSeminar {
        date: format_date(change.key.date),
        time: format_time(change.key.time),
        old_participants: change.old_count,
        new_participants: change.new_count,
    }
}

fn removed_entry(removal: &Removal) -> RemovedSeminar {
    RemovedSeminar {
        date: format_date(removal.key.date),
        time: format_time(removal.key.time),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Reconcile an unrecognized page as an empty listing instead of failing.
    pub treat_unrecognized_as_empty: bool,
    /// Give up on the fetch after this long. Reconciliation is never cut short.
    pub fetch_timeout: Option<Duration>,
}

/// Scrape `source` and reconcile the result into `store`.
pub async fn run_sync<L, S>(
    source: &L,
    store: &S,
    options: SyncOptions,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> SyncResponse
where
    L: ListingSource,
    S: SeminarStore,
{
    let fetched = match options.fetch_timeout {
        Some(limit) => match tokio::time::timeout(limit, source.fetch(today)).await {
            Ok(fetched) => fetched,
            Err(_) => {
                log_warn!("scrape exceeded {limit:?}, aborted");
                return SyncResponse::failure(format!("Scraping timed out after {limit:?}"));
            }
        },
        None => source.fetch(today).await,
    };

    let scraped = match fetched {
        Ok(ScrapeOutcome::Listed(seminars)) => seminars,
        Ok(ScrapeOutcome::Unrecognized { reason }) if options.treat_unrecognized_as_empty => {
            log_warn!("calendar not recognized ({reason}), treating as empty listing");
            Vec::new()
        }
        Ok(ScrapeOutcome::Unrecognized { reason }) => {
            log_error!("calendar not recognized: {reason}");
            return SyncResponse::failure(format!("Calendar page not recognized: {reason}"));
        }
        Err(err) => {
            log_error!("scrape failed: {err}");
            return SyncResponse::failure(format!("Scraping failed: {err}"));
        }
    };

    match reconcile::reconcile(store, &scraped, today, now).await {
        Ok(report) => {
            log_info!(
                "sync finished: {} added, {} updated, {} removed, {} failed",
                report.added.len(),
                report.updated.len(),
                report.removed.len(),
                report.failed
            );
            SyncResponse::from_report(report)
        }
        Err(err) => {
            log_error!("reconcile failed: {err:#}");
            SyncResponse::failure(format!("{err:#}"))
        }
    }
}

/// Append `response` to the sync history. Failures are logged only.
pub async fn record_run(db: &Database, response: &SyncResponse, executed_at: DateTime<Utc>) {
    let run = NewSyncRun {
        executed_at,
        success: response.success,
        added_count: response.added.len(),
        updated_count: response.updated.len(),
        removed_count: response.removed.len(),
        error_message: response.error.clone(),
    };
    if let Err(err) = db.insert_sync_run(&run).await {
        log_error!("failed to record sync run: {err:#}");
    }
}

/// One full run against the live site, recorded in the history.
pub async fn trigger(state: &AppState) -> SyncResponse {
    let settings = state.settings.snapshot();
    let now = Utc::now();
    let today = Local::now().date_naive();

    let response = match Credentials::from_env() {
        Ok(credentials) => {
            let source = HttpListingSource::new(
                settings.source.clone(),
                settings.sync.max_attempts,
                credentials,
            );
            let store = SqliteSeminarStore::new(state.db.clone(), settings.sync.deletion_mode);
            let options = SyncOptions {
                treat_unrecognized_as_empty: settings.sync.treat_unrecognized_as_empty,
                fetch_timeout: Some(Duration::from_secs(settings.sync.run_timeout_secs)),
            };
            run_sync(&source, &store, options, today, now).await
        }
        Err(err) => {
            log_error!("cannot sync: {err}");
            SyncResponse::failure(err.to_string())
        }
    };

    record_run(&state.db, &response, now).await;
    response
}
