pub mod blocked_dates;
pub mod seminars;
pub mod staff;
pub mod sync_runs;
