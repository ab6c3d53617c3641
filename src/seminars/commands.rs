use anyhow::Result;
use chrono::NaiveDate;

use crate::{
    db::{Seminar, SeminarWithStaff},
    AppState,
};

use super::{build_schedule, ScheduleDay};

pub async fn list_seminars(
    state: &AppState,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<SeminarWithStaff>> {
    state.db.list_seminars_with_staff(from, to).await
}

/// Assign `staff_id` to a seminar; `None` clears the assignment.
pub async fn assign_staff(
    state: &AppState,
    seminar_id: &str,
    staff_id: Option<i64>,
) -> Result<Seminar> {
    state.db.assign_seminar_staff(seminar_id, staff_id).await
}

pub async fn schedule(state: &AppState, from: NaiveDate, to: NaiveDate) -> Result<Vec<ScheduleDay>> {
    let seminars = state.db.list_seminars_with_staff(Some(from), Some(to)).await?;
    let blocked = state.db.list_blocked_dates(Some(from), Some(to)).await?;
    build_schedule(from, to, seminars, blocked)
}
