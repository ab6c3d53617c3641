pub mod blocked_date;
pub mod seminar;
pub mod staff;
pub mod sync_run;

pub use blocked_date::BlockedDate;
pub use seminar::{ScrapedSeminar, Seminar, SeminarKey, SeminarWithStaff};
pub use staff::{Staff, StaffSummary};
pub use sync_run::{NewSyncRun, SyncRun};
