use std::collections::HashSet;

use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_date, parse_datetime},
    models::{BlockedDate, StaffSummary},
};

fn row_to_blocked_date(row: &Row) -> Result<BlockedDate> {
    let date: String = row.get("date")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let staff_id: Option<i64> = row.get("staff_id")?;
    let staff_name: Option<String> = row.get("staff_name")?;

    let staff = match (staff_id, staff_name) {
        (Some(id), Some(name)) => Some(StaffSummary {
            id,
            name,
            theme_color: row.get("staff_theme_color")?,
            display_order: row.get("staff_display_order")?,
        }),
        _ => None,
    };

    Ok(BlockedDate {
        id: row.get("id")?,
        date: parse_date(&date, "date")?,
        reason: row.get("reason")?,
        staff_id,
        staff,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

const BLOCKED_DATE_SELECT: &str = "SELECT b.id, b.date, b.reason, b.staff_id, b.created_at, b.updated_at,
        st.name AS staff_name,
        st.theme_color AS staff_theme_color,
        st.display_order AS staff_display_order
 FROM blocked_dates b
 LEFT JOIN staff st ON st.id = b.staff_id";

impl Database {
    /// Blocked dates ordered by date, joined with staff, optionally limited to
    /// an inclusive range.
    pub async fn list_blocked_dates(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<BlockedDate>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{BLOCKED_DATE_SELECT}
                 WHERE (?1 IS NULL OR b.date >= ?1)
                   AND (?2 IS NULL OR b.date <= ?2)
                 ORDER BY b.date ASC, b.id ASC"
            ))?;

            let mut rows = stmt.query(params![from.map(format_date), to.map(format_date)])?;
            let mut blocked = Vec::new();
            while let Some(row) = rows.next()? {
                blocked.push(row_to_blocked_date(row)?);
            }

            Ok(blocked)
        })
        .await
    }

    /// Block `dates` for one staff member (or everyone with `None`).
    ///
    /// Dates already blocked for the same target are skipped; if nothing is
    /// left to insert the call fails. The remaining rows go in one transaction.
    pub async fn insert_blocked_dates(
        &self,
        dates: Vec<NaiveDate>,
        staff_id: Option<i64>,
        reason: Option<String>,
    ) -> Result<Vec<BlockedDate>> {
        self.execute(move |conn| {
            let existing: HashSet<String> = {
                let mut stmt = conn.prepare(
                    "SELECT date FROM blocked_dates WHERE staff_id IS ?1",
                )?;
                let mut rows = stmt.query(params![staff_id])?;
                let mut existing = HashSet::new();
                while let Some(row) = rows.next()? {
                    existing.insert(row.get::<_, String>(0)?);
                }
                existing
            };

            let mut seen = HashSet::new();
            let fresh: Vec<String> = dates
                .into_iter()
                .map(format_date)
                .filter(|date| !existing.contains(date) && seen.insert(date.clone()))
                .collect();

            if fresh.is_empty() {
                match staff_id {
                    Some(id) => bail!("All requested dates are already blocked for staff {id}"),
                    None => bail!("All requested dates are already blocked for everyone"),
                }
            }

            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            let mut ids = Vec::with_capacity(fresh.len());
            for date in &fresh {
                tx.execute(
                    "INSERT INTO blocked_dates (date, reason, staff_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![date, reason, staff_id, now, now],
                )?;
                ids.push(tx.last_insert_rowid());
            }
            tx.commit()?;

            let mut stmt = conn.prepare(&format!("{BLOCKED_DATE_SELECT} WHERE b.id = ?1"))?;
            let mut inserted = Vec::with_capacity(ids.len());
            for id in ids {
                let mut rows = stmt.query(params![id])?;
                if let Some(row) = rows.next()? {
                    inserted.push(row_to_blocked_date(row)?);
                }
            }
            Ok(inserted)
        })
        .await
    }

    /// Delete the given blocked dates; returns how many rows went away.
    pub async fn delete_blocked_dates(&self, ids: Vec<i64>) -> Result<usize> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            for id in ids {
                removed += tx.execute("DELETE FROM blocked_dates WHERE id = ?1", params![id])?;
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    pub async fn delete_all_blocked_dates(&self) -> Result<usize> {
        self.execute(|conn| Ok(conn.execute("DELETE FROM blocked_dates", [])?))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::open_temp;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    #[tokio::test]
    async fn existing_dates_are_filtered_per_target() {
        let (_dir, db) = open_temp();
        let staff = db.create_staff("A".into(), "#3B82F6".into()).await.unwrap();

        db.insert_blocked_dates(vec![day(1), day(2)], None, Some("holiday".into()))
            .await
            .unwrap();
        // Same day for a single person is a different rule.
        let personal = db
            .insert_blocked_dates(vec![day(1)], Some(staff.id), None)
            .await
            .unwrap();
        assert_eq!(personal.len(), 1);
        assert_eq!(personal[0].staff.as_ref().map(|s| s.name.as_str()), Some("A"));

        let added = db
            .insert_blocked_dates(vec![day(2), day(3), day(3)], None, None)
            .await
            .unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].date, day(3));

        let err = db
            .insert_blocked_dates(vec![day(1), day(2)], None, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already blocked for everyone"));
    }

    #[tokio::test]
    async fn listing_is_ordered_and_ranged() {
        let (_dir, db) = open_temp();
        db.insert_blocked_dates(vec![day(9), day(3), day(5)], None, None)
            .await
            .unwrap();

        let dates: Vec<NaiveDate> = db
            .list_blocked_dates(Some(day(4)), None)
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.date)
            .collect();
        assert_eq!(dates, vec![day(5), day(9)]);
    }

    #[tokio::test]
    async fn delete_by_ids_and_all() {
        let (_dir, db) = open_temp();
        let rows = db
            .insert_blocked_dates(vec![day(1), day(2), day(3)], None, None)
            .await
            .unwrap();

        let removed = db
            .delete_blocked_dates(vec![rows[0].id, 9999])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(db.delete_all_blocked_dates().await.unwrap(), 2);
        assert!(db.list_blocked_dates(None, None).await.unwrap().is_empty());
    }
}
