//! Seminar listing, staff assignment and the per-day schedule view.

pub mod commands;

use std::collections::{BTreeMap, HashSet};

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::db::{BlockedDate, SeminarWithStaff, StaffSummary};

const MAX_SCHEDULE_DAYS: i64 = 366;

/// Who is unavailable on a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "staff", rename_all = "lowercase")]
pub enum BlockedSummary {
    /// At least one block on the day applies to everybody.
    Everyone,
    /// Individually blocked staff, in display order.
    Staff(Vec<StaffSummary>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDay {
    pub date: NaiveDate,
    pub seminars: Vec<SeminarWithStaff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<BlockedSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

/// One entry per day from `from` to `to` inclusive.
pub fn build_schedule(
    from: NaiveDate,
    to: NaiveDate,
    seminars: Vec<SeminarWithStaff>,
    blocked: Vec<BlockedDate>,
) -> Result<Vec<ScheduleDay>> {
    if from > to {
        bail!("Start date {from} is after end date {to}");
    }
    if (to - from).num_days() >= MAX_SCHEDULE_DAYS {
        bail!("Schedule range is limited to {MAX_SCHEDULE_DAYS} days");
    }

    let mut seminars_by_day: BTreeMap<NaiveDate, Vec<SeminarWithStaff>> = BTreeMap::new();
    for seminar in seminars {
        seminars_by_day
            .entry(seminar.seminar.date)
            .or_default()
            .push(seminar);
    }
    let mut blocked_by_day: BTreeMap<NaiveDate, Vec<BlockedDate>> = BTreeMap::new();
    for block in blocked {
        blocked_by_day.entry(block.date).or_default().push(block);
    }

    Ok(from
        .iter_days()
        .take_while(|date| *date <= to)
        .map(|date| {
            let blocks = blocked_by_day.remove(&date).unwrap_or_default();
            let mut seen = HashSet::new();
            let reasons: Vec<String> = blocks
                .iter()
                .filter_map(|b| b.reason.clone())
                .filter(|reason| seen.insert(reason.clone()))
                .collect();
            ScheduleDay {
                date,
                seminars: seminars_by_day.remove(&date).unwrap_or_default(),
                blocked: summarize_blocks(blocks),
                reasons,
            }
        })
        .collect())
}

fn summarize_blocks(blocks: Vec<BlockedDate>) -> Option<BlockedSummary> {
    if blocks.is_empty() {
        return None;
    }
    if blocks.iter().any(BlockedDate::applies_to_everyone) {
        return Some(BlockedSummary::Everyone);
    }
    let mut staff: Vec<StaffSummary> = blocks.into_iter().filter_map(|b| b.staff).collect();
    staff.sort_by_key(|s| (s.display_order, s.id));
    staff.dedup_by_key(|s| s.id);
    Some(BlockedSummary::Staff(staff))
}
