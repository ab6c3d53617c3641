//! Reconciliation of a fresh listing against the stored seminars.
//!
//! [`plan`] is a pure diff; [`apply`] pushes it into a [`SeminarStore`] one
//! mutation at a time. A failed mutation is logged and left out of the
//! report, and the pass carries on. Nothing is batched, so an interrupted
//! pass is repaired by running the next one.

pub mod plan;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::db::ScrapedSeminar;

pub use plan::{plan, CountChange, ReconcilePlan, Removal};
pub use store::{DeletionMode, SeminarStore, SqliteSeminarStore};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// What a pass actually changed in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub added: Vec<ScrapedSeminar>,
    pub updated: Vec<CountChange>,
    pub removed: Vec<Removal>,
    pub failed: usize,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Apply `plan` to `store`, best effort.
pub async fn apply<S: SeminarStore>(
    store: &S,
    plan: ReconcilePlan,
    now: DateTime<Utc>,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for record in plan.added {
        match store.insert(&record, now).await {
            Ok(_) => {
                log_debug!("added seminar {}", record.key());
                report.added.push(record);
            }
            Err(err) => {
                log_error!("failed to add seminar {}: {err:#}", record.key());
                report.failed += 1;
            }
        }
    }

    for change in plan.updated {
        match store
            .update_participants(&change.seminar_id, change.new_count, now)
            .await
        {
            Ok(()) => {
                log_debug!(
                    "updated seminar {}: {} -> {}",
                    change.key,
                    change.old_count,
                    change.new_count
                );
                report.updated.push(change);
            }
            Err(err) => {
                log_error!("failed to update seminar {}: {err:#}", change.key);
                report.failed += 1;
            }
        }
    }

    for removal in plan.removed {
        match store.remove(&removal.seminar_id, now).await {
            Ok(()) => {
                log_debug!("removed seminar {}", removal.key);
                report.removed.push(removal);
            }
            Err(err) => {
                log_error!("failed to remove seminar {}: {err:#}", removal.key);
                report.failed += 1;
            }
        }
    }

    report
}

/// Read the store, diff it against `scraped` and apply the result.
///
/// Only the initial read can fail the pass; mutation failures are counted in
/// [`ReconcileReport::failed`].
pub async fn reconcile<S: SeminarStore>(
    store: &S,
    scraped: &[ScrapedSeminar],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<ReconcileReport> {
    let persisted = store
        .list_active()
        .await
        .context("failed to read stored seminars")?;

    let plan = plan(scraped, &persisted, today);
    log_info!(
        "reconcile plan: {} added, {} updated, {} removed, {} unchanged, {} retained",
        plan.added.len(),
        plan.updated.len(),
        plan.removed.len(),
        plan.unchanged,
        plan.retained
    );

    let report = apply(store, plan, now).await;
    if report.failed > 0 {
        log_error!("{} store mutations failed during reconcile", report.failed);
    }
    Ok(report)
}
