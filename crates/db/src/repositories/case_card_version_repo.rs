//! Repository for the immutable `case_card_versions` table.
//!
//! Versions are only ever inserted. The table's trigger rejects UPDATE and
//! DELETE, so this repository offers neither.

use casecard_core::content::CaseCardContent;
use casecard_core::types::DbId;
use casecard_core::versioning::SemVer;
use sqlx::postgres::PgExecutor;
use sqlx::PgConnection;

use crate::models::case_card_version::{CaseCardVersion, VersionSummary};

/// Column list for `case_card_versions` queries.
const COLUMNS: &str = "\
    id, case_card_id, version_number, header_info, patient_flags, instrumentation, \
    equipment, supplies, medications, setup_positioning, surgeon_notes, \
    created_by_user_id, created_at";

/// Column list for history listings.
const SUMMARY_COLUMNS: &str = "id, case_card_id, version_number, created_by_user_id, created_at";

pub struct CaseCardVersionRepo;

impl CaseCardVersionRepo {
    /// Store a full content snapshot.
    pub async fn insert(
        conn: &mut PgConnection,
        case_card_id: DbId,
        version: SemVer,
        content: &CaseCardContent,
        created_by_user_id: DbId,
    ) -> Result<CaseCardVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO case_card_versions \
                (case_card_id, version_number, header_info, patient_flags, instrumentation, \
                 equipment, supplies, medications, setup_positioning, surgeon_notes, \
                 created_by_user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CaseCardVersion>(&query)
            .bind(case_card_id)
            .bind(version.to_string())
            .bind(&content.header_info)
            .bind(&content.patient_flags)
            .bind(&content.instrumentation)
            .bind(&content.equipment)
            .bind(&content.supplies)
            .bind(&content.medications)
            .bind(&content.setup_positioning)
            .bind(&content.surgeon_notes)
            .bind(created_by_user_id)
            .fetch_one(conn)
            .await
    }

    /// Find a version belonging to the given card.
    pub async fn find_for_card<'e, E: PgExecutor<'e>>(
        executor: E,
        case_card_id: DbId,
        version_id: DbId,
    ) -> Result<Option<CaseCardVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM case_card_versions WHERE id = $1 AND case_card_id = $2"
        );
        sqlx::query_as::<_, CaseCardVersion>(&query)
            .bind(version_id)
            .bind(case_card_id)
            .fetch_optional(executor)
            .await
    }

    /// Version history for a card, oldest first.
    pub async fn list_for_card<'e, E: PgExecutor<'e>>(
        executor: E,
        case_card_id: DbId,
    ) -> Result<Vec<VersionSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM case_card_versions \
             WHERE case_card_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, VersionSummary>(&query)
            .bind(case_card_id)
            .fetch_all(executor)
            .await
    }
}
