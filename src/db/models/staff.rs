use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A staff member who can be assigned to seminars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: i64,
    pub name: String,
    pub theme_color: String,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The staff columns carried along when joined onto seminars or blocked dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSummary {
    pub id: i64,
    pub name: String,
    pub theme_color: String,
    pub display_order: i64,
}

impl From<Staff> for StaffSummary {
    fn from(staff: Staff) -> Self {
        Self {
            id: staff.id,
            name: staff.name,
            theme_color: staff.theme_color,
            display_order: staff.display_order,
        }
    }
}
