//! Seminar session models.
//!
//! A session is identified by its `SeminarKey` (date + start time); the
//! listing site exposes no stable id of its own.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::staff::StaffSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeminarKey {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl SeminarKey {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }
}

impl fmt::Display for SeminarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date.format("%Y-%m-%d"), self.time.format("%H:%M:%S"))
    }
}

/// One row extracted from the listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedSeminar {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub participant_count: u32,
}

impl ScrapedSeminar {
    pub fn key(&self) -> SeminarKey {
        SeminarKey::new(self.date, self.time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seminar {
    pub id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub participant_count: u32,
    pub staff_id: Option<i64>,
    pub scraped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Seminar {
    pub fn key(&self) -> SeminarKey {
        SeminarKey::new(self.date, self.time)
    }
}

/// Seminar joined with its assigned staff member, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeminarWithStaff {
    #[serde(flatten)]
    pub seminar: Seminar,
    pub staff: Option<StaffSummary>,
}
