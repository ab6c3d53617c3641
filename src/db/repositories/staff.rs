use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{connection::Database, helpers::parse_datetime, models::Staff};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

fn row_to_staff(row: &Row) -> Result<Staff> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Staff {
        id: row.get("id")?,
        name: row.get("name")?,
        theme_color: row.get("theme_color")?,
        display_order: row.get("display_order")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn load_staff(conn: &Connection, staff_id: i64) -> Result<Option<Staff>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, theme_color, display_order, created_at, updated_at
         FROM staff
         WHERE id = ?1",
    )?;
    let mut rows = stmt.query(params![staff_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_staff(row)?)),
        None => Ok(None),
    }
}

fn load_all_staff(conn: &Connection) -> Result<Vec<Staff>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, theme_color, display_order, created_at, updated_at
         FROM staff
         ORDER BY display_order ASC, id ASC",
    )?;
    let mut rows = stmt.query([])?;
    let mut staff = Vec::new();
    while let Some(row) = rows.next()? {
        staff.push(row_to_staff(row)?);
    }
    Ok(staff)
}

fn color_taken(conn: &Connection, theme_color: &str, except_id: Option<i64>) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM staff WHERE theme_color = ?1 AND (?2 IS NULL OR id != ?2)",
        params![theme_color, except_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

impl Database {
    /// Create a staff member at the end of the display order.
    /// Returns an error if the theme colour is already used.
    pub async fn create_staff(&self, name: String, theme_color: String) -> Result<Staff> {
        self.execute(move |conn| {
            let now = Utc::now();

            // Check and insert within the same DB task to avoid races.
            if color_taken(conn, &theme_color, None)? {
                bail!("Theme color {theme_color} is already used by another staff member");
            }

            let next_order: i64 = conn.query_row(
                "SELECT COALESCE(MAX(display_order), -1) + 1 FROM staff",
                [],
                |row| row.get(0),
            )?;

            conn.execute(
                "INSERT INTO staff (name, theme_color, display_order, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, theme_color, next_order, now.to_rfc3339(), now.to_rfc3339()],
            )?;

            let staff_id = conn.last_insert_rowid();
            load_staff(conn, staff_id)?.ok_or_else(|| anyhow!("Staff not found after insert"))
        })
        .await
    }

    /// All staff in display order.
    pub async fn list_staff(&self) -> Result<Vec<Staff>> {
        self.execute(|conn| load_all_staff(conn)).await
    }

    pub async fn get_staff(&self, staff_id: i64) -> Result<Option<Staff>> {
        self.execute(move |conn| load_staff(conn, staff_id)).await
    }

    /// Update a staff member's name and/or theme colour.
    pub async fn update_staff(
        &self,
        staff_id: i64,
        name: Option<String>,
        theme_color: Option<String>,
    ) -> Result<Staff> {
        self.execute(move |conn| {
            let now = Utc::now();

            let mut updates = Vec::new();
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(n) = name.clone() {
                updates.push("name = ?");
                params_vec.push(Box::new(n));
            }
            if let Some(c) = theme_color.clone() {
                if color_taken(conn, &c, Some(staff_id))? {
                    bail!("Theme color {c} is already used by another staff member");
                }
                updates.push("theme_color = ?");
                params_vec.push(Box::new(c));
            }

            if updates.is_empty() {
                return Err(anyhow!("No fields to update"));
            }

            updates.push("updated_at = ?");
            params_vec.push(Box::new(now.to_rfc3339()));

            let query = format!("UPDATE staff SET {} WHERE id = ?", updates.join(", "));
            params_vec.push(Box::new(staff_id));

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let rows_affected = conn.execute(&query, params_refs.as_slice())?;
            if rows_affected == 0 {
                return Err(anyhow!("Staff {staff_id} not found"));
            }

            load_staff(conn, staff_id)?.ok_or_else(|| anyhow!("Staff not found after update"))
        })
        .await
    }

    /// Delete a staff member. Their seminars become unassigned and their
    /// personal blocked dates go with them.
    pub async fn delete_staff(&self, staff_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "UPDATE seminars SET staff_id = NULL, updated_at = ?1 WHERE staff_id = ?2",
                params![Utc::now().to_rfc3339(), staff_id],
            )?;
            tx.execute(
                "DELETE FROM blocked_dates WHERE staff_id = ?1",
                params![staff_id],
            )?;
            let rows_affected = tx.execute("DELETE FROM staff WHERE id = ?1", params![staff_id])?;
            if rows_affected == 0 {
                return Err(anyhow!("Staff {staff_id} not found"));
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Swap a staff member with its neighbour and renumber the display order
    /// from zero. Moving past either end is a no-op.
    pub async fn move_staff(&self, staff_id: i64, direction: MoveDirection) -> Result<Vec<Staff>> {
        self.execute(move |conn| {
            let mut staff = load_all_staff(conn)?;
            let index = staff
                .iter()
                .position(|s| s.id == staff_id)
                .ok_or_else(|| anyhow!("Staff {staff_id} not found"))?;

            let target = match direction {
                MoveDirection::Up => index.checked_sub(1),
                MoveDirection::Down => Some(index + 1).filter(|&i| i < staff.len()),
            };
            let Some(target) = target else {
                return Ok(staff);
            };
            staff.swap(index, target);

            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;
            for (order, member) in staff.iter().enumerate() {
                let order = i64::try_from(order)?;
                if member.display_order != order {
                    tx.execute(
                        "UPDATE staff SET display_order = ?1, updated_at = ?2 WHERE id = ?3",
                        params![order, now, member.id],
                    )?;
                }
            }
            tx.commit()?;

            load_all_staff(conn)
        })
        .await
    }
}
