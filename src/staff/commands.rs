use anyhow::Result;

use crate::{
    db::{MoveDirection, Staff},
    AppState,
};

use super::{next_available_color, normalize_color, normalize_name};

pub async fn list_staff(state: &AppState) -> Result<Vec<Staff>> {
    state.db.list_staff().await
}

/// Colour a new staff member would get by default.
pub async fn next_staff_color(state: &AppState) -> Result<String> {
    let staff = state.db.list_staff().await?;
    Ok(next_available_color(staff.iter().map(|s| s.theme_color.as_str())).to_string())
}

/// Create a staff member. A missing colour takes the next free palette entry.
pub async fn create_staff(state: &AppState, name: String, theme_color: Option<String>) -> Result<Staff> {
    let theme_color = match theme_color {
        Some(color) => normalize_color(&color)?,
        None => next_staff_color(state).await?,
    };
    state.db.create_staff(normalize_name(&name)?, theme_color).await
}

pub async fn update_staff(
    state: &AppState,
    staff_id: i64,
    name: Option<String>,
    theme_color: Option<String>,
) -> Result<Staff> {
    let name = name.as_deref().map(normalize_name).transpose()?;
    let theme_color = theme_color.as_deref().map(normalize_color).transpose()?;
    state.db.update_staff(staff_id, name, theme_color).await
}

pub async fn delete_staff(state: &AppState, staff_id: i64) -> Result<()> {
    state.db.delete_staff(staff_id).await
}

pub async fn move_staff(
    state: &AppState,
    staff_id: i64,
    direction: MoveDirection,
) -> Result<Vec<Staff>> {
    state.db.move_staff(staff_id, direction).await
}
