//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - Insert inputs built by the service layer after validation
//! - Strict `Deserialize` request bodies (`deny_unknown_fields`)

pub mod case_card;
pub mod case_card_version;
pub mod edit_log;
pub mod feedback;
pub mod surgical_case;
pub mod user;
