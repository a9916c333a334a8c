//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Reads
//! accept any `PgExecutor` (a pool or an open transaction); writes take
//! `&mut PgConnection` so they always join the caller's unit of work.

pub mod append_only;
pub mod case_card_repo;
pub mod case_card_version_repo;
pub mod edit_log_repo;
pub mod feedback_repo;
pub mod surgical_case_repo;
pub mod user_repo;

pub use append_only::{AppendOnlyLog, AppendOnlyRecord};
pub use case_card_repo::CaseCardRepo;
pub use case_card_version_repo::CaseCardVersionRepo;
pub use edit_log_repo::EditLog;
pub use feedback_repo::FeedbackRepo;
pub use surgical_case_repo::SurgicalCaseRepo;
pub use user_repo::UserRepo;
