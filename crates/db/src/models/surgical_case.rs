//! Read-only view of scheduled surgical cases.

use casecard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `surgical_cases` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SurgicalCase {
    pub id: DbId,
    pub facility_id: DbId,
    pub procedure_name: String,
    pub scheduled_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
