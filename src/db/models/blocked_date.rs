use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::staff::StaffSummary;

/// A day on which one staff member, or everyone when `staff_id` is `None`,
/// is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedDate {
    pub id: i64,
    pub date: NaiveDate,
    pub reason: Option<String>,
    pub staff_id: Option<i64>,
    pub staff: Option<StaffSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlockedDate {
    pub fn applies_to_everyone(&self) -> bool {
        self.staff_id.is_none()
    }
}
