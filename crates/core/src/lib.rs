//! Domain rules for versioned surgical case cards.
//!
//! Everything here is pure: no I/O, no database access. The `db` and `api`
//! crates call into these modules to decide what a transition is allowed to
//! do before they persist it.

pub mod content;
pub mod edit_log;
pub mod error;
pub mod feedback;
pub mod governance;
pub mod hashing;
pub mod lifecycle;
pub mod lock;
pub mod pagination;
pub mod roles;
pub mod types;
pub mod versioning;
