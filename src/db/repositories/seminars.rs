use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{
        format_date, format_time, parse_date, parse_datetime, parse_optional_datetime,
        parse_time, to_u32,
    },
    models::{ScrapedSeminar, Seminar, SeminarWithStaff, StaffSummary},
};

const SEMINAR_COLUMNS: &str = "s.id, s.event_date, s.event_time, s.participant_count, s.staff_id, \
     s.scraped_at, s.created_at, s.updated_at, s.deleted_at";

fn row_to_seminar(row: &Row) -> Result<Seminar> {
    let event_date: String = row.get("event_date")?;
    let event_time: String = row.get("event_time")?;
    let participant_count: i64 = row.get("participant_count")?;
    let scraped_at: String = row.get("scraped_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let deleted_at: Option<String> = row.get("deleted_at")?;

    Ok(Seminar {
        id: row.get("id")?,
        date: parse_date(&event_date, "event_date")?,
        time: parse_time(&event_time, "event_time")?,
        participant_count: to_u32(participant_count, "participant_count")?,
        staff_id: row.get("staff_id")?,
        scraped_at: parse_datetime(&scraped_at, "scraped_at")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
        deleted_at: parse_optional_datetime(deleted_at, "deleted_at")?,
    })
}

fn row_to_seminar_with_staff(row: &Row) -> Result<SeminarWithStaff> {
    let seminar = row_to_seminar(row)?;
    let staff_name: Option<String> = row.get("staff_name")?;
    let staff = match (seminar.staff_id, staff_name) {
        (Some(id), Some(name)) => Some(StaffSummary {
            id,
            name,
            theme_color: row.get("staff_theme_color")?,
            display_order: row.get("staff_display_order")?,
        }),
        _ => None,
    };
    Ok(SeminarWithStaff { seminar, staff })
}

fn load_seminar(conn: &rusqlite::Connection, seminar_id: &str) -> Result<Option<Seminar>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SEMINAR_COLUMNS} FROM seminars s WHERE s.id = ?1"
    ))?;
    let mut rows = stmt.query(params![seminar_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_seminar(row)?)),
        None => Ok(None),
    }
}

impl Database {
    /// All seminars not soft-deleted, ordered by date then time.
    pub async fn list_active_seminars(&self) -> Result<Vec<Seminar>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SEMINAR_COLUMNS}
                 FROM seminars s
                 WHERE s.deleted_at IS NULL
                 ORDER BY s.event_date ASC, s.event_time ASC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut seminars = Vec::new();
            while let Some(row) = rows.next()? {
                seminars.push(row_to_seminar(row)?);
            }

            Ok(seminars)
        })
        .await
    }

    /// Active seminars joined with their staff, optionally limited to an
    /// inclusive date range.
    pub async fn list_seminars_with_staff(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<SeminarWithStaff>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SEMINAR_COLUMNS},
                        st.name AS staff_name,
                        st.theme_color AS staff_theme_color,
                        st.display_order AS staff_display_order
                 FROM seminars s
                 LEFT JOIN staff st ON st.id = s.staff_id
                 WHERE s.deleted_at IS NULL
                   AND (?1 IS NULL OR s.event_date >= ?1)
                   AND (?2 IS NULL OR s.event_date <= ?2)
                 ORDER BY s.event_date ASC, s.event_time ASC"
            ))?;

            let mut rows = stmt.query(params![from.map(format_date), to.map(format_date)])?;
            let mut seminars = Vec::new();
            while let Some(row) = rows.next()? {
                seminars.push(row_to_seminar_with_staff(row)?);
            }

            Ok(seminars)
        })
        .await
    }

    pub async fn get_seminar(&self, seminar_id: &str) -> Result<Option<Seminar>> {
        let seminar_id = seminar_id.to_string();
        self.execute(move |conn| load_seminar(conn, &seminar_id)).await
    }

    /// Insert a freshly listed session. The store assigns id and timestamps.
    pub async fn insert_seminar(
        &self,
        record: &ScrapedSeminar,
        scraped_at: DateTime<Utc>,
    ) -> Result<Seminar> {
        let record = record.clone();
        self.execute(move |conn| {
            let id = Uuid::new_v4().to_string();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO seminars (id, event_date, event_time, participant_count, staff_id, scraped_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6, ?7)",
                params![
                    id,
                    format_date(record.date),
                    format_time(record.time),
                    i64::from(record.participant_count),
                    scraped_at.to_rfc3339(),
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )
            .with_context(|| format!("failed to insert seminar {}", record.key()))?;

            load_seminar(conn, &id)?.ok_or_else(|| anyhow!("Seminar not found after insert"))
        })
        .await
    }

    /// Overwrite the participant count; every other column stays as it is.
    pub async fn update_seminar_participants(
        &self,
        seminar_id: &str,
        participant_count: u32,
        scraped_at: DateTime<Utc>,
    ) -> Result<()> {
        let seminar_id = seminar_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE seminars
                 SET participant_count = ?1,
                     scraped_at = ?2,
                     updated_at = ?3
                 WHERE id = ?4 AND deleted_at IS NULL",
                params![
                    i64::from(participant_count),
                    scraped_at.to_rfc3339(),
                    Utc::now().to_rfc3339(),
                    seminar_id,
                ],
            )?;

            if rows_affected == 0 {
                bail!("Seminar {seminar_id} not found or already deleted");
            }
            Ok(())
        })
        .await
    }

    pub async fn delete_seminar(&self, seminar_id: &str) -> Result<()> {
        let seminar_id = seminar_id.to_string();
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM seminars WHERE id = ?1", params![seminar_id])?;
            if rows_affected == 0 {
                bail!("Seminar {seminar_id} not found");
            }
            Ok(())
        })
        .await
    }

    /// Mark a seminar as no longer listed while keeping the row for history.
    pub async fn soft_delete_seminar(
        &self,
        seminar_id: &str,
        deleted_at: DateTime<Utc>,
    ) -> Result<()> {
        let seminar_id = seminar_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE seminars
                 SET deleted_at = ?1, updated_at = ?2
                 WHERE id = ?3 AND deleted_at IS NULL",
                params![deleted_at.to_rfc3339(), deleted_at.to_rfc3339(), seminar_id],
            )?;
            if rows_affected == 0 {
                bail!("Seminar {seminar_id} not found or already deleted");
            }
            Ok(())
        })
        .await
    }

    /// Assign a staff member to a seminar, or clear the assignment with `None`.
    pub async fn assign_seminar_staff(
        &self,
        seminar_id: &str,
        staff_id: Option<i64>,
    ) -> Result<Seminar> {
        let seminar_id = seminar_id.to_string();
        self.execute(move |conn| {
            if let Some(staff_id) = staff_id {
                let exists = conn
                    .query_row(
                        "SELECT id FROM staff WHERE id = ?1",
                        params![staff_id],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?;
                if exists.is_none() {
                    bail!("Staff {staff_id} not found");
                }
            }

            let rows_affected = conn.execute(
                "UPDATE seminars
                 SET staff_id = ?1, updated_at = ?2
                 WHERE id = ?3 AND deleted_at IS NULL",
                params![staff_id, Utc::now().to_rfc3339(), seminar_id],
            )?;
            if rows_affected == 0 {
                bail!("Seminar {seminar_id} not found or already deleted");
            }

            load_seminar(conn, &seminar_id)?
                .ok_or_else(|| anyhow!("Seminar not found after update"))
        })
        .await
    }
}
