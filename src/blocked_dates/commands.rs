use anyhow::{bail, Result};
use chrono::NaiveDate;

use crate::{db::BlockedDate, AppState};

use super::BlockedDateSelection;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

pub async fn list_blocked_dates(
    state: &AppState,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<BlockedDate>> {
    state.db.list_blocked_dates(from, to).await
}

/// Block the selected dates for `staff_id`, or for everyone with `None`.
pub async fn add_blocked_dates(
    state: &AppState,
    selection: BlockedDateSelection,
    staff_id: Option<i64>,
    reason: Option<String>,
) -> Result<Vec<BlockedDate>> {
    let dates = selection.expand()?;
    if let Some(id) = staff_id {
        if state.db.get_staff(id).await?.is_none() {
            bail!("Staff {id} not found");
        }
    }
    let reason = reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let requested = dates.len();
    let inserted = state.db.insert_blocked_dates(dates, staff_id, reason).await?;
    if inserted.len() < requested {
        log_info!(
            "{} of {requested} dates were already blocked and skipped",
            requested - inserted.len()
        );
    }
    Ok(inserted)
}

pub async fn delete_blocked_dates(state: &AppState, ids: Vec<i64>) -> Result<usize> {
    if ids.is_empty() {
        bail!("No blocked date ids given");
    }
    state.db.delete_blocked_dates(ids).await
}

pub async fn clear_blocked_dates(state: &AppState) -> Result<usize> {
    state.db.delete_all_blocked_dates().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::open_temp_state;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn overlapping_ranges_only_add_new_days() {
        let (_dir, state) = open_temp_state();
        let first = BlockedDateSelection::Range {
            start: date(2025, 3, 1),
            end: date(2025, 3, 3),
        };
        let second = BlockedDateSelection::Range {
            start: date(2025, 3, 3),
            end: date(2025, 3, 4),
        };

        assert_eq!(add_blocked_dates(&state, first.clone(), None, None).await.unwrap().len(), 3);
        let added = add_blocked_dates(&state, second, None, Some("  ".into()))
            .await
            .unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].date, date(2025, 3, 4));
        assert_eq!(added[0].reason, None);

        assert!(add_blocked_dates(&state, first, None, None).await.is_err());
    }

    #[tokio::test]
    async fn staff_blocks_are_separate_from_everyone() {
        let (_dir, state) = open_temp_state();
        let staff = state.db.create_staff("A".into(), "#3B82F6".into()).await.unwrap();
        let day = BlockedDateSelection::Single {
            date: date(2025, 3, 1),
        };

        add_blocked_dates(&state, day.clone(), None, Some("holiday".into()))
            .await
            .unwrap();
        let personal = add_blocked_dates(&state, day.clone(), Some(staff.id), None)
            .await
            .unwrap();
        assert_eq!(personal[0].staff.as_ref().map(|s| s.name.as_str()), Some("A"));

        assert!(add_blocked_dates(&state, day, Some(staff.id + 100), None).await.is_err());
        assert_eq!(list_blocked_dates(&state, None, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let (_dir, state) = open_temp_state();
        let added = add_blocked_dates(
            &state,
            BlockedDateSelection::List {
                dates: vec![date(2025, 3, 1), date(2025, 3, 8), date(2025, 3, 15)],
            },
            None,
            None,
        )
        .await
        .unwrap();

        assert!(delete_blocked_dates(&state, Vec::new()).await.is_err());
        assert_eq!(delete_blocked_dates(&state, vec![added[0].id]).await.unwrap(), 1);
        assert_eq!(clear_blocked_dates(&state).await.unwrap(), 2);
        assert!(list_blocked_dates(&state, None, None).await.unwrap().is_empty());
    }
}
