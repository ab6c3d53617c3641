use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
    pub id: i64,
    pub executed_at: DateTime<Utc>,
    pub success: bool,
    pub added_count: usize,
    pub updated_count: usize,
    pub removed_count: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSyncRun {
    pub executed_at: DateTime<Utc>,
    pub success: bool,
    pub added_count: usize,
    pub updated_count: usize,
    pub removed_count: usize,
    pub error_message: Option<String>,
}
