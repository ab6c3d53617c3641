//! Extraction of seminar rows from the booking site's calendar page.
//!
//! The page lists sessions inside the first `mb30` block, one `<table>` per
//! session. In each table the last two `fw-b` texts are the start
//! ("7/12(金) 12:00｜90分") and the participant count. Two looser fallbacks
//! cover markup variants seen in the wild.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveTime};
use regex::Regex;

use crate::db::ScrapedSeminar;

use super::ScrapeOutcome;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// A month/day more than this many days behind the reference date belongs
/// to the following year.
const YEAR_ROLLOVER_DAYS: i64 = 180;

struct Patterns {
    schedule_block: Regex,
    table: Regex,
    strong_text: Regex,
    strong_element: Regex,
    text_node: Regex,
    session_start: Regex,
    leading_count: Regex,
    bare_count: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |pattern: &str| Regex::new(pattern).expect("calendar regex must compile");
        Patterns {
            schedule_block: compile(r#"(?i)<[^>]+class\s*=\s*["'][^"']*\bmb30\b[^"']*["'][^>]*>"#),
            table: compile(r"(?is)<table[^>]*>.*?</table>"),
            strong_text: compile(
                r#"(?i)<[^>]+class\s*=\s*["'][^"']*\bfw-b\b[^"']*["'][^>]*>([^<]+)<"#,
            ),
            strong_element: compile(
                r#"(?is)<[^>]+class\s*=\s*["'][^"']*fw-b[^"']*["'][^>]*>.*?</[^>]+>"#,
            ),
            text_node: compile(r">([^<]+)<"),
            session_start: compile(r"(\d+)/(\d+)[^0-9]*(\d+):(\d+)"),
            leading_count: compile(r"^\s*(\d+)"),
            bare_count: compile(r"^\d+$"),
        }
    })
}

/// True when the page still asks for credentials, i.e. the login did not take.
pub fn is_login_page(html: &str) -> bool {
    html.contains("MasterCustomerPassword") && !html.contains("ログアウト")
}

/// Parse the calendar page. `today` anchors the year, which the page omits.
pub fn parse_calendar(html: &str, today: NaiveDate) -> ScrapeOutcome {
    let p = patterns();

    let mut block_starts = p.schedule_block.find_iter(html).map(|m| m.start());
    let Some(start) = block_starts.next() else {
        return ScrapeOutcome::Unrecognized {
            reason: "schedule block (class \"mb30\") not found on calendar page".into(),
        };
    };
    let end = block_starts.next().unwrap_or(html.len());
    let block = &html[start..end];

    let tables: Vec<&str> = p.table.find_iter(block).map(|m| m.as_str()).collect();
    log_info!("calendar block has {} tables", tables.len());

    let seminars = tables
        .iter()
        .enumerate()
        .filter_map(|(index, table)| {
            let parsed = parse_table(table, today);
            if parsed.is_none() {
                log_debug!("table {index} has no recognizable session, skipping");
            }
            parsed
        })
        .collect();

    ScrapeOutcome::Listed(seminars)
}

fn parse_table(table: &str, today: NaiveDate) -> Option<ScrapedSeminar> {
    let p = patterns();

    let strong: Vec<&str> = p
        .strong_text
        .captures_iter(table)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .collect();
    if let [.., start, count] = strong.as_slice() {
        return parse_session(start, count, today);
    }

    // `fw-b` wrapping nested markup, e.g. <p class="fw-b"><span>7/12 ...</span>
    let nested: Vec<&str> = p
        .strong_element
        .find_iter(table)
        .filter_map(|m| p.text_node.captures(m.as_str()))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|text| !text.is_empty())
        .collect();
    if let [.., start, count] = nested.as_slice() {
        if let Some(seminar) = parse_session(start, count, today) {
            return Some(seminar);
        }
    }

    // Any text that looks like a start directly followed by a bare number.
    let texts: Vec<&str> = p
        .text_node
        .captures_iter(table)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|text| !text.is_empty())
        .collect();
    texts.windows(2).find_map(|pair| {
        if p.session_start.is_match(pair[0]) && p.bare_count.is_match(pair[1]) {
            parse_session(pair[0], pair[1], today)
        } else {
            None
        }
    })
}

fn parse_session(start: &str, count: &str, today: NaiveDate) -> Option<ScrapedSeminar> {
    let p = patterns();
    let Some(caps) = p.session_start.captures(start) else {
        log_debug!("no session start in {start:?}");
        return None;
    };
    let number = |index: usize| caps.get(index)?.as_str().parse::<u32>().ok();

    let date = infer_date(number(1)?, number(2)?, today)?;
    let time = NaiveTime::from_hms_opt(number(3)?, number(4)?, 0)?;
    // A count that does not start with digits reads as zero.
    let participant_count = p
        .leading_count
        .captures(count)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    Some(ScrapedSeminar {
        date,
        time,
        participant_count,
    })
}

fn infer_date(month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    match NaiveDate::from_ymd_opt(today.year(), month, day) {
        Some(date) if (today - date).num_days() <= YEAR_ROLLOVER_DAYS => Some(date),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn listed(outcome: ScrapeOutcome) -> Vec<ScrapedSeminar> {
        match outcome {
            ScrapeOutcome::Listed(seminars) => seminars,
            ScrapeOutcome::Unrecognized { reason } => panic!("unrecognized: {reason}"),
        }
    }

    const STANDARD_PAGE: &str = r#"
<html><body>
<div class="header">ログアウト</div>
<div class="box mb30">
  <table class="event">
    <tr><td class="fw-b">はじめての講座</td></tr>
    <tr><td><span class="fw-b">7/12(金) 12:00｜90分</span></td><td><span class="fw-b"> 3 </span></td></tr>
  </table>
  <table class="event">
    <tr><td class="fw-b">はじめての講座</td></tr>
    <tr><td><span class="fw-b">7/19(金) 9:05｜90分</span></td><td><span class="fw-b">0</span></td></tr>
  </table>
  <table class="event"><tr><td class="fw-b">準備中</td></tr></table>
</div>
<div class="mb30">
  <table><tr><td class="fw-b">8/1(木) 10:00</td><td class="fw-b">9</td></tr></table>
</div>
</body></html>"#;

    #[test]
    fn reads_sessions_from_first_schedule_block() {
        let seminars = listed(parse_calendar(STANDARD_PAGE, date(2025, 7, 1)));
        assert_eq!(
            seminars,
            vec![
                ScrapedSeminar {
                    date: date(2025, 7, 12),
                    time: time(12, 0),
                    participant_count: 3,
                },
                ScrapedSeminar {
                    date: date(2025, 7, 19),
                    time: time(9, 5),
                    participant_count: 0,
                },
            ]
        );
    }

    #[test]
    fn nested_markup_falls_back_to_element_text() {
        let html = r#"<div class="mb30"><table>
            <tr><td><p class="fw-b"><span>7/12(土) 10:30</span></p></td>
                <td><p class="fw-b"><em>5名</em></p></td></tr>
        </table></div>"#;
        let seminars = listed(parse_calendar(html, date(2025, 7, 1)));
        assert_eq!(seminars.len(), 1);
        assert_eq!(seminars[0].time, time(10, 30));
        assert_eq!(seminars[0].participant_count, 5);
    }

    #[test]
    fn plain_cells_fall_back_to_text_scan() {
        let html = r#"<section class="mb30"><table>
            <tr><td>講座</td><td>7/12(土) 10:30</td><td>4</td></tr>
        </table></section>"#;
        let seminars = listed(parse_calendar(html, date(2025, 7, 1)));
        assert_eq!(seminars.len(), 1);
        assert_eq!(seminars[0].date, date(2025, 7, 12));
        assert_eq!(seminars[0].participant_count, 4);
    }

    #[test]
    fn empty_block_is_an_empty_listing() {
        let html = r#"<div class="mb30"><p>現在予定はありません</p></div>"#;
        assert!(listed(parse_calendar(html, date(2025, 7, 1))).is_empty());
    }

    #[test]
    fn missing_block_is_unrecognized() {
        let html = "<html><body><p>maintenance</p></body></html>";
        assert!(matches!(
            parse_calendar(html, date(2025, 7, 1)),
            ScrapeOutcome::Unrecognized { .. }
        ));
    }

    #[test]
    fn class_name_must_match_whole_word() {
        let html = r#"<div class="mb300"><table><tr><td class="fw-b">7/12 10:00</td><td class="fw-b">1</td></tr></table></div>"#;
        assert!(matches!(
            parse_calendar(html, date(2025, 7, 1)),
            ScrapeOutcome::Unrecognized { .. }
        ));
    }

    #[test]
    fn impossible_dates_are_skipped() {
        let html = r#"<div class="mb30"><table><tr><td class="fw-b">13/40(?) 10:00</td><td class="fw-b">1</td></tr></table></div>"#;
        assert!(listed(parse_calendar(html, date(2025, 7, 1))).is_empty());
    }

    #[test]
    fn year_rolls_over_for_early_months_late_in_the_year() {
        assert_eq!(infer_date(1, 5, date(2025, 12, 20)), Some(date(2026, 1, 5)));
        assert_eq!(infer_date(6, 30, date(2025, 7, 1)), Some(date(2025, 6, 30)));
        assert_eq!(infer_date(12, 28, date(2025, 12, 20)), Some(date(2025, 12, 28)));
    }

    #[test]
    fn login_page_detection() {
        assert!(is_login_page(r#"<input id="MasterCustomerPassword" name="MasterCustomerPassword">"#));
        assert!(!is_login_page(STANDARD_PAGE));
    }
}
