//! Days on which staff (or everyone) cannot work.

pub mod commands;

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Longest span a range selection may cover.
const MAX_RANGE_DAYS: i64 = 731;

/// How the dates to block are picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum BlockedDateSelection {
    Single { date: NaiveDate },
    List { dates: Vec<NaiveDate> },
    /// Every day from `start` to `end`, inclusive.
    Range { start: NaiveDate, end: NaiveDate },
    /// Days in the inclusive range falling on one of `weekdays`.
    Weekdays {
        start: NaiveDate,
        end: NaiveDate,
        weekdays: Vec<Weekday>,
    },
}

impl BlockedDateSelection {
    /// The concrete dates, ascending and without duplicates.
    pub fn expand(&self) -> Result<Vec<NaiveDate>> {
        let mut dates = match self {
            BlockedDateSelection::Single { date } => vec![*date],
            BlockedDateSelection::List { dates } => {
                if dates.is_empty() {
                    bail!("No dates given");
                }
                dates.clone()
            }
            BlockedDateSelection::Range { start, end } => days_between(*start, *end)?,
            BlockedDateSelection::Weekdays {
                start,
                end,
                weekdays,
            } => {
                if weekdays.is_empty() {
                    bail!("Select at least one weekday");
                }
                let dates: Vec<NaiveDate> = days_between(*start, *end)?
                    .into_iter()
                    .filter(|date| weekdays.contains(&date.weekday()))
                    .collect();
                if dates.is_empty() {
                    bail!("No {} falls between {start} and {end}", weekday_list(weekdays));
                }
                dates
            }
        };
        dates.sort_unstable();
        dates.dedup();
        Ok(dates)
    }
}

fn days_between(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    if start > end {
        bail!("Start date {start} is after end date {end}");
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
        bail!("Date range {start}..{end} is longer than {MAX_RANGE_DAYS} days");
    }
    Ok(start.iter_days().take_while(|date| *date <= end).collect())
}

fn weekday_list(weekdays: &[Weekday]) -> String {
    weekdays
        .iter()
        .map(|day| day.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse a comma separated weekday list such as `mon,wed,fri`.
pub fn parse_weekdays(input: &str) -> Result<Vec<Weekday>> {
    let mut weekdays = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Ok(day) = part.parse::<Weekday>() else {
            bail!("Unknown weekday '{part}'");
        };
        if !weekdays.contains(&day) {
            weekdays.push(day);
        }
    }
    if weekdays.is_empty() {
        bail!("Select at least one weekday");
    }
    Ok(weekdays)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_and_list() {
        let single = BlockedDateSelection::Single {
            date: date(2025, 3, 1),
        };
        assert_eq!(single.expand().unwrap(), vec![date(2025, 3, 1)]);

        let list = BlockedDateSelection::List {
            dates: vec![date(2025, 3, 5), date(2025, 3, 1), date(2025, 3, 5)],
        };
        assert_eq!(list.expand().unwrap(), vec![date(2025, 3, 1), date(2025, 3, 5)]);

        let empty = BlockedDateSelection::List { dates: Vec::new() };
        assert!(empty.expand().is_err());
    }

    #[test]
    fn range_is_inclusive() {
        let range = BlockedDateSelection::Range {
            start: date(2025, 2, 27),
            end: date(2025, 3, 2),
        };
        assert_eq!(
            range.expand().unwrap(),
            vec![date(2025, 2, 27), date(2025, 2, 28), date(2025, 3, 1), date(2025, 3, 2)]
        );
    }

    #[test]
    fn reversed_or_huge_ranges_are_rejected() {
        let reversed = BlockedDateSelection::Range {
            start: date(2025, 3, 2),
            end: date(2025, 3, 1),
        };
        assert!(reversed.expand().is_err());

        let huge = BlockedDateSelection::Range {
            start: date(2025, 1, 1),
            end: date(2030, 1, 1),
        };
        assert!(huge.expand().is_err());
    }

    #[test]
    fn weekdays_filter_the_range() {
        // 2025-03-01 is a Saturday.
        let selection = BlockedDateSelection::Weekdays {
            start: date(2025, 3, 1),
            end: date(2025, 3, 14),
            weekdays: vec![Weekday::Mon, Weekday::Sat],
        };
        assert_eq!(
            selection.expand().unwrap(),
            vec![date(2025, 3, 1), date(2025, 3, 3), date(2025, 3, 8), date(2025, 3, 10)]
        );

        let none = BlockedDateSelection::Weekdays {
            start: date(2025, 3, 1),
            end: date(2025, 3, 14),
            weekdays: Vec::new(),
        };
        assert!(none.expand().is_err());
    }

    #[test]
    fn weekday_parsing() {
        assert_eq!(
            parse_weekdays("mon, Wed,monday").unwrap(),
            vec![Weekday::Mon, Weekday::Wed]
        );
        assert!(parse_weekdays("funday").is_err());
        assert!(parse_weekdays(" , ").is_err());
    }
}
