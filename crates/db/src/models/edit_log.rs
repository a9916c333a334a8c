//! Case card edit-log entries.

use casecard_core::edit_log::{EditAction, HashedFields};
use casecard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `case_card_edit_log` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EditLogEntry {
    pub id: DbId,
    pub case_card_id: DbId,
    pub editor_user_id: DbId,
    pub editor_name: String,
    pub editor_role: String,
    pub action_type: String,
    pub change_summary: String,
    pub reason_for_change: Option<String>,
    pub previous_version_id: Option<DbId>,
    pub new_version_id: Option<DbId>,
    pub integrity_hash: String,
    pub edited_at: Timestamp,
}

impl EditLogEntry {
    /// The fields covered by this entry's integrity hash.
    pub fn hashed_fields(&self) -> HashedFields<'_> {
        HashedFields {
            case_card_id: self.case_card_id,
            editor_user_id: self.editor_user_id,
            action_type: &self.action_type,
            change_summary: &self.change_summary,
            reason_for_change: self.reason_for_change.as_deref(),
            previous_version_id: self.previous_version_id,
            new_version_id: self.new_version_id,
            edited_at: self.edited_at,
        }
    }
}

/// An entry to append. The integrity hash is computed at append time.
#[derive(Debug, Clone)]
pub struct NewEditLogEntry {
    pub case_card_id: DbId,
    pub editor_user_id: DbId,
    pub editor_name: String,
    pub editor_role: String,
    pub action: EditAction,
    pub change_summary: String,
    pub reason_for_change: Option<String>,
    pub previous_version_id: Option<DbId>,
    pub new_version_id: Option<DbId>,
}
