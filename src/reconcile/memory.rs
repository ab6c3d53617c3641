use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};

use crate::db::{ScrapedSeminar, Seminar, SeminarKey};

use super::store::SeminarStore;

/// In-memory `SeminarStore` for tests, with per-key failure injection.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Seminar>>,
    next_id: Mutex<u64>,
    failing: HashSet<SeminarKey>,
    fail_reads: bool,
    mutation_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn with_rows(rows: Vec<Seminar>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Every mutation touching `key` fails.
    pub fn failing_on(mut self, key: SeminarKey) -> Self {
        self.failing.insert(key);
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Every update and removal sleeps this long before touching the rows.
    pub fn with_mutation_delay(mut self, delay: Duration) -> Self {
        self.mutation_delay = Some(delay);
        self
    }

    pub fn rows(&self) -> Vec<Seminar> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.mutation_delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(&self, key: SeminarKey) -> Result<()> {
        if self.failing.contains(&key) {
            bail!("injected failure for {key}");
        }
        Ok(())
    }
}

impl SeminarStore for MemoryStore {
    async fn list_active(&self) -> Result<Vec<Seminar>> {
        if self.fail_reads {
            bail!("injected read failure");
        }
        let mut rows = self.rows();
        rows.sort_by_key(Seminar::key);
        Ok(rows)
    }

    async fn insert(&self, record: &ScrapedSeminar, scraped_at: DateTime<Utc>) -> Result<Seminar> {
        self.check(record.key())?;
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        if rows.iter().any(|row| row.key() == record.key()) {
            bail!("duplicate key {}", record.key());
        }
        let mut next_id = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
        *next_id += 1;
        let seminar = Seminar {
            id: format!("mem-{}", *next_id),
            date: record.date,
            time: record.time,
            participant_count: record.participant_count,
            staff_id: None,
            scraped_at,
            created_at: scraped_at,
            updated_at: scraped_at,
            deleted_at: None,
        };
        rows.push(seminar.clone());
        Ok(seminar)
    }

    async fn update_participants(
        &self,
        seminar_id: &str,
        participant_count: u32,
        scraped_at: DateTime<Utc>,
    ) -> Result<()> {
        self.pause().await;
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let row = rows
            .iter_mut()
            .find(|row| row.id == seminar_id)
            .ok_or_else(|| anyhow!("no seminar {seminar_id}"))?;
        self.check(row.key())?;
        row.participant_count = participant_count;
        row.scraped_at = scraped_at;
        row.updated_at = scraped_at;
        Ok(())
    }

    async fn remove(&self, seminar_id: &str, _removed_at: DateTime<Utc>) -> Result<()> {
        self.pause().await;
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let index = rows
            .iter()
            .position(|row| row.id == seminar_id)
            .ok_or_else(|| anyhow!("no seminar {seminar_id}"))?;
        self.check(rows[index].key())?;
        rows.remove(index);
        Ok(())
    }
}
