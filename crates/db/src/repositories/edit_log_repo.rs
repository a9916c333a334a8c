//! Append-only storage for `case_card_edit_log`.

use casecard_core::edit_log::{compute_integrity_hash, HashedFields};
use casecard_core::types::Timestamp;
use sqlx::PgConnection;

use crate::models::edit_log::{EditLogEntry, NewEditLogEntry};
use crate::repositories::append_only::{AppendOnlyLog, AppendOnlyRecord};

/// Column list for `case_card_edit_log` queries.
const COLUMNS: &str = "\
    id, case_card_id, editor_user_id, editor_name, editor_role, action_type, \
    change_summary, reason_for_change, previous_version_id, new_version_id, \
    integrity_hash, edited_at";

/// The case card audit trail.
pub type EditLog = AppendOnlyLog<EditLogEntry>;

impl AppendOnlyRecord for EditLogEntry {
    type New = NewEditLogEntry;

    const TABLE: &'static str = "case_card_edit_log";
    const COLUMNS: &'static str = COLUMNS;
    const SCOPE_COLUMN: &'static str = "case_card_id";

    /// Chains the new entry onto the card's latest hash. Callers hold the
    /// card row lock, so appends for one card are serialized.
    async fn insert(
        conn: &mut PgConnection,
        new: &NewEditLogEntry,
    ) -> Result<EditLogEntry, sqlx::Error> {
        let prev_hash: Option<String> = sqlx::query_scalar(
            "SELECT integrity_hash FROM case_card_edit_log \
             WHERE case_card_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(new.case_card_id)
        .fetch_optional(&mut *conn)
        .await?;

        let edited_at = now_micros();
        let action_type = new.action.as_str();
        let integrity_hash = compute_integrity_hash(
            prev_hash.as_deref(),
            &HashedFields {
                case_card_id: new.case_card_id,
                editor_user_id: new.editor_user_id,
                action_type,
                change_summary: &new.change_summary,
                reason_for_change: new.reason_for_change.as_deref(),
                previous_version_id: new.previous_version_id,
                new_version_id: new.new_version_id,
                edited_at,
            },
        );

        let query = format!(
            "INSERT INTO case_card_edit_log \
                (case_card_id, editor_user_id, editor_name, editor_role, action_type, \
                 change_summary, reason_for_change, previous_version_id, new_version_id, \
                 integrity_hash, edited_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EditLogEntry>(&query)
            .bind(new.case_card_id)
            .bind(new.editor_user_id)
            .bind(&new.editor_name)
            .bind(&new.editor_role)
            .bind(action_type)
            .bind(&new.change_summary)
            .bind(&new.reason_for_change)
            .bind(new.previous_version_id)
            .bind(new.new_version_id)
            .bind(&integrity_hash)
            .bind(edited_at)
            .fetch_one(&mut *conn)
            .await
    }
}

/// Current time truncated to the microsecond precision Postgres stores, so a
/// re-read row hashes identically.
fn now_micros() -> Timestamp {
    let now = chrono::Utc::now();
    Timestamp::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}
