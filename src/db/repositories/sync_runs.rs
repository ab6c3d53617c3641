use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_usize},
    models::{NewSyncRun, SyncRun},
};

fn row_to_sync_run(row: &Row) -> Result<SyncRun> {
    let executed_at: String = row.get("executed_at")?;

    Ok(SyncRun {
        id: row.get("id")?,
        executed_at: parse_datetime(&executed_at, "executed_at")?,
        success: row.get("success")?,
        added_count: to_usize(row.get("added_count")?, "added_count")?,
        updated_count: to_usize(row.get("updated_count")?, "updated_count")?,
        removed_count: to_usize(row.get("removed_count")?, "removed_count")?,
        error_message: row.get("error_message")?,
    })
}

impl Database {
    pub async fn insert_sync_run(&self, run: &NewSyncRun) -> Result<i64> {
        let record = run.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sync_runs (executed_at, success, added_count, updated_count, removed_count, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.executed_at.to_rfc3339(),
                    record.success,
                    i64::try_from(record.added_count)?,
                    i64::try_from(record.updated_count)?,
                    i64::try_from(record.removed_count)?,
                    record.error_message,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Most recent runs first.
    pub async fn list_sync_runs(&self, limit: usize) -> Result<Vec<SyncRun>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, executed_at, success, added_count, updated_count, removed_count, error_message
                 FROM sync_runs
                 ORDER BY executed_at DESC, id DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![i64::try_from(limit)?])?;
            let mut runs = Vec::new();
            while let Some(row) = rows.next()? {
                runs.push(row_to_sync_run(row)?);
            }

            Ok(runs)
        })
        .await
    }
}
