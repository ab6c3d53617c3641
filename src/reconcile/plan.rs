use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::{ScrapedSeminar, Seminar, SeminarKey};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// A stored seminar whose participant count changed on the listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountChange {
    pub seminar_id: String,
    pub key: SeminarKey,
    pub old_count: u32,
    pub new_count: u32,
}

/// A stored, not-yet-past seminar that is no longer listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Removal {
    pub seminar_id: String,
    pub key: SeminarKey,
}

/// Classification of one scrape against one store snapshot.
///
/// `added` and `updated` keep scrape order, `removed` keeps the order of the
/// persisted snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilePlan {
    pub added: Vec<ScrapedSeminar>,
    pub updated: Vec<CountChange>,
    pub removed: Vec<Removal>,
    pub unchanged: usize,
    pub retained: usize,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Diff `scraped` against `persisted`.
///
/// Persisted keys must be unique. A key repeated within `scraped` is counted
/// once, at its first occurrence. Persisted rows missing from the scrape are
/// removed only when their date is on or after `today`; older rows are kept
/// as history.
pub fn plan(scraped: &[ScrapedSeminar], persisted: &[Seminar], today: NaiveDate) -> ReconcilePlan {
    let by_key: HashMap<SeminarKey, &Seminar> =
        persisted.iter().map(|seminar| (seminar.key(), seminar)).collect();

    let mut result = ReconcilePlan::default();
    let mut seen: HashSet<SeminarKey> = HashSet::with_capacity(scraped.len());

    for record in scraped {
        let key = record.key();
        if !seen.insert(key) {
            log_warn!("listing repeats seminar {key}; keeping the first occurrence");
            continue;
        }

        match by_key.get(&key) {
            None => result.added.push(record.clone()),
            Some(existing) if existing.participant_count != record.participant_count => {
                result.updated.push(CountChange {
                    seminar_id: existing.id.clone(),
                    key,
                    old_count: existing.participant_count,
                    new_count: record.participant_count,
                });
            }
            Some(_) => result.unchanged += 1,
        }
    }

    for seminar in persisted {
        let key = seminar.key();
        if seen.contains(&key) {
            continue;
        }
        if seminar.date >= today {
            result.removed.push(Removal {
                seminar_id: seminar.id.clone(),
                key,
            });
        } else {
            log_debug!("keeping past seminar {key} that is no longer listed");
            result.retained += 1;
        }
    }

    result
}
