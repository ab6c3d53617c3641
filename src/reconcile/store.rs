use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, ScrapedSeminar, Seminar};

/// How a seminar that disappeared from the listing leaves the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionMode {
    /// Row is deleted.
    #[default]
    Hard,
    /// Row is kept with `deleted_at` set and drops out of active reads.
    Soft,
}

impl std::str::FromStr for DeletionMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "hard" => Ok(DeletionMode::Hard),
            "soft" => Ok(DeletionMode::Soft),
            other => Err(anyhow::anyhow!("unknown deletion mode '{other}' (expected hard or soft)")),
        }
    }
}

/// The store operations a reconciliation pass needs.
#[allow(async_fn_in_trait)]
pub trait SeminarStore {
    /// Active rows ordered by date then time.
    async fn list_active(&self) -> Result<Vec<Seminar>>;

    async fn insert(&self, record: &ScrapedSeminar, scraped_at: DateTime<Utc>) -> Result<Seminar>;

    async fn update_participants(
        &self,
        seminar_id: &str,
        participant_count: u32,
        scraped_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn remove(&self, seminar_id: &str, removed_at: DateTime<Utc>) -> Result<()>;
}

/// `SeminarStore` over the SQLite database.
#[derive(Clone)]
pub struct SqliteSeminarStore {
    db: Database,
    deletion: DeletionMode,
}

impl SqliteSeminarStore {
    pub fn new(db: Database, deletion: DeletionMode) -> Self {
        Self { db, deletion }
    }
}

impl SeminarStore for SqliteSeminarStore {
    async fn list_active(&self) -> Result<Vec<Seminar>> {
        self.db.list_active_seminars().await
    }

    async fn insert(&self, record: &ScrapedSeminar, scraped_at: DateTime<Utc>) -> Result<Seminar> {
        self.db.insert_seminar(record, scraped_at).await
    }

    async fn update_participants(
        &self,
        seminar_id: &str,
        participant_count: u32,
        scraped_at: DateTime<Utc>,
    ) -> Result<()> {
        self.db
            .update_seminar_participants(seminar_id, participant_count, scraped_at)
            .await
    }

    async fn remove(&self, seminar_id: &str, removed_at: DateTime<Utc>) -> Result<()> {
        match self.deletion {
            DeletionMode::Hard => self.db.delete_seminar(seminar_id).await,
            DeletionMode::Soft => self.db.soft_delete_seminar(seminar_id, removed_at).await,
        }
    }
}
