mod connection;
mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use helpers::{format_date, format_time};
pub use models::{
    BlockedDate, NewSyncRun, ScrapedSeminar, Seminar, SeminarKey, SeminarWithStaff, Staff,
    StaffSummary, SyncRun,
};
pub use repositories::staff::MoveDirection;

#[cfg(test)]
pub(crate) use connection::test_support;
