//! Repository for the `case_cards` table.
//!
//! Mutating methods take `&mut PgConnection` so they run inside the caller's
//! transaction. Row-locking reads (`FOR UPDATE`) only make sense there too.

use casecard_core::lifecycle::CardStatus;
use casecard_core::lock::EditLock;
use casecard_core::types::{DbId, Timestamp};
use casecard_core::versioning::SemVer;
use sqlx::postgres::PgExecutor;
use sqlx::PgConnection;

use crate::models::case_card::{CaseCard, HeaderPatch, NewCaseCard};

/// Column list for `case_cards` queries.
const COLUMNS: &str = "\
    id, facility_id, surgeon_id, procedure_name, procedure_codes, case_type, \
    default_duration_minutes, turnover_notes, status, \
    version_major, version_minor, version_patch, current_version_id, \
    lock_holder_user_id, locked_at, lock_expires_at, \
    deleted_at, deleted_by_user_id, delete_reason, \
    created_by_user_id, created_at, updated_at";

/// Provides persistence for case card headers.
pub struct CaseCardRepo;

impl CaseCardRepo {
    /// Insert a new DRAFT card at version 1.0.0 with no current version yet.
    pub async fn insert(conn: &mut PgConnection, input: &NewCaseCard) -> Result<CaseCard, sqlx::Error> {
        let query = format!(
            "INSERT INTO case_cards \
                (facility_id, surgeon_id, procedure_name, procedure_codes, case_type, \
                 default_duration_minutes, turnover_notes, created_by_user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CaseCard>(&query)
            .bind(input.facility_id)
            .bind(input.surgeon_id)
            .bind(&input.procedure_name)
            .bind(&input.procedure_codes)
            .bind(&input.case_type)
            .bind(input.default_duration_minutes)
            .bind(&input.turnover_notes)
            .bind(input.created_by_user_id)
            .fetch_one(conn)
            .await
    }

    /// Find a card within a facility. Cards in other facilities are invisible.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        facility_id: DbId,
        id: DbId,
    ) -> Result<Option<CaseCard>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM case_cards WHERE id = $1 AND facility_id = $2");
        sqlx::query_as::<_, CaseCard>(&query)
            .bind(id)
            .bind(facility_id)
            .fetch_optional(executor)
            .await
    }

    /// Find a card and take its row lock for the rest of the transaction.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        facility_id: DbId,
        id: DbId,
    ) -> Result<Option<CaseCard>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM case_cards WHERE id = $1 AND facility_id = $2 FOR UPDATE"
        );
        sqlx::query_as::<_, CaseCard>(&query)
            .bind(id)
            .bind(facility_id)
            .fetch_optional(conn)
            .await
    }

    /// Lock every card sharing the (facility, surgeon, procedure) key, in id
    /// order so concurrent activations cannot deadlock.
    pub async fn lock_siblings(
        conn: &mut PgConnection,
        facility_id: DbId,
        surgeon_id: DbId,
        procedure_name: &str,
    ) -> Result<Vec<CaseCard>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM case_cards \
             WHERE facility_id = $1 AND surgeon_id = $2 AND lower(procedure_name) = lower($3) \
             ORDER BY id ASC \
             FOR UPDATE"
        );
        sqlx::query_as::<_, CaseCard>(&query)
            .bind(facility_id)
            .bind(surgeon_id)
            .bind(procedure_name)
            .fetch_all(conn)
            .await
    }

    /// Whether any card, in any status, already uses this name for the surgeon.
    pub async fn name_taken(
        conn: &mut PgConnection,
        facility_id: DbId,
        surgeon_id: DbId,
        procedure_name: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM case_cards \
                WHERE facility_id = $1 AND surgeon_id = $2 AND lower(procedure_name) = lower($3))",
        )
        .bind(facility_id)
        .bind(surgeon_id)
        .bind(procedure_name)
        .fetch_one(conn)
        .await
    }

    /// The ACTIVE card holding the key, other than `excluding_id`.
    pub async fn active_for_key(
        conn: &mut PgConnection,
        facility_id: DbId,
        surgeon_id: DbId,
        procedure_name: &str,
        excluding_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM case_cards \
             WHERE facility_id = $1 AND surgeon_id = $2 AND lower(procedure_name) = lower($3) \
               AND status = 'ACTIVE' AND id <> $4",
        )
        .bind(facility_id)
        .bind(surgeon_id)
        .bind(procedure_name)
        .bind(excluding_id)
        .fetch_optional(conn)
        .await
    }

    /// Serialize name-uniqueness checks for one (facility, surgeon, name) key
    /// until the transaction ends.
    pub async fn lock_name_key(
        conn: &mut PgConnection,
        facility_id: DbId,
        surgeon_id: DbId,
        procedure_name: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "SELECT pg_advisory_xact_lock( \
                hashtextextended($1::TEXT || ':' || $2::TEXT || ':' || lower($3), 0))",
        )
        .bind(facility_id)
        .bind(surgeon_id)
        .bind(procedure_name)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Point the card at a new version, applying any header changes.
    pub async fn set_current_version(
        conn: &mut PgConnection,
        id: DbId,
        version_id: DbId,
        version: SemVer,
        header: &HeaderPatch,
    ) -> Result<CaseCard, sqlx::Error> {
        let query = format!(
            "UPDATE case_cards SET \
                current_version_id = $2, \
                version_major = $3, version_minor = $4, version_patch = $5, \
                procedure_name = COALESCE($6, procedure_name), \
                procedure_codes = COALESCE($7, procedure_codes), \
                case_type = COALESCE($8, case_type), \
                default_duration_minutes = COALESCE($9, default_duration_minutes), \
                turnover_notes = COALESCE($10, turnover_notes) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CaseCard>(&query)
            .bind(id)
            .bind(version_id)
            .bind(version.major)
            .bind(version.minor)
            .bind(version.patch)
            .bind(&header.procedure_name)
            .bind(&header.procedure_codes)
            .bind(&header.case_type)
            .bind(header.default_duration_minutes)
            .bind(&header.turnover_notes)
            .fetch_one(conn)
            .await
    }

    pub async fn set_status(
        conn: &mut PgConnection,
        id: DbId,
        status: CardStatus,
    ) -> Result<CaseCard, sqlx::Error> {
        let query = format!("UPDATE case_cards SET status = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, CaseCard>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(conn)
            .await
    }

    /// ACTIVE -> DEPRECATED for one card. A deprecated card is read-only, so
    /// any held lock is dropped with the transition.
    pub async fn deprecate(conn: &mut PgConnection, id: DbId) -> Result<CaseCard, sqlx::Error> {
        let query = format!(
            "UPDATE case_cards SET \
                status = 'DEPRECATED', \
                lock_holder_user_id = NULL, locked_at = NULL, lock_expires_at = NULL \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CaseCard>(&query)
            .bind(id)
            .fetch_one(conn)
            .await
    }

    /// Move the given ACTIVE cards to DEPRECATED, dropping their locks.
    /// Returns the affected ids.
    pub async fn deprecate_active(
        conn: &mut PgConnection,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar(
            "UPDATE case_cards SET \
                status = 'DEPRECATED', \
                lock_holder_user_id = NULL, locked_at = NULL, lock_expires_at = NULL \
             WHERE id = ANY($1) AND status = 'ACTIVE' \
             RETURNING id",
        )
        .bind(ids)
        .fetch_all(conn)
        .await
    }

    /// Tombstone a card. Any held lock is dropped with it.
    pub async fn soft_delete(
        conn: &mut PgConnection,
        id: DbId,
        deleted_by_user_id: DbId,
        reason: &str,
    ) -> Result<CaseCard, sqlx::Error> {
        let query = format!(
            "UPDATE case_cards SET \
                status = 'DELETED', deleted_at = NOW(), deleted_by_user_id = $2, delete_reason = $3, \
                lock_holder_user_id = NULL, locked_at = NULL, lock_expires_at = NULL \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CaseCard>(&query)
            .bind(id)
            .bind(deleted_by_user_id)
            .bind(reason)
            .fetch_one(conn)
            .await
    }

    // -----------------------------------------------------------------------
    // Edit lock
    // -----------------------------------------------------------------------

    pub async fn set_lock(
        conn: &mut PgConnection,
        id: DbId,
        lock: &EditLock,
    ) -> Result<CaseCard, sqlx::Error> {
        let query = format!(
            "UPDATE case_cards SET \
                lock_holder_user_id = $2, locked_at = $3, lock_expires_at = $4 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CaseCard>(&query)
            .bind(id)
            .bind(lock.holder_user_id)
            .bind(lock.locked_at)
            .bind(lock.expires_at)
            .fetch_one(conn)
            .await
    }

    pub async fn clear_lock(conn: &mut PgConnection, id: DbId) -> Result<CaseCard, sqlx::Error> {
        let query = format!(
            "UPDATE case_cards SET \
                lock_holder_user_id = NULL, locked_at = NULL, lock_expires_at = NULL \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CaseCard>(&query)
            .bind(id)
            .fetch_one(conn)
            .await
    }

    /// Lazily drop a lock that expired before `now`. Returns `true` if one was
    /// cleared.
    pub async fn clear_expired_lock<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE case_cards SET \
                lock_holder_user_id = NULL, locked_at = NULL, lock_expires_at = NULL \
             WHERE id = $1 AND lock_expires_at IS NOT NULL AND lock_expires_at < $2",
        )
        .bind(id)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Facility-wide variant of [`Self::clear_expired_lock`], run before listings.
    pub async fn clear_expired_locks_for_facility<'e, E: PgExecutor<'e>>(
        executor: E,
        facility_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE case_cards SET \
                lock_holder_user_id = NULL, locked_at = NULL, lock_expires_at = NULL \
             WHERE facility_id = $1 AND lock_expires_at IS NOT NULL AND lock_expires_at < $2",
        )
        .bind(facility_id)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    /// List a facility's cards, newest first.
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        facility_id: DbId,
        status: Option<CardStatus>,
        surgeon_id: Option<DbId>,
        name_contains: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CaseCard>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM case_cards \
             WHERE facility_id = $1 \
               AND ($2::TEXT IS NULL OR status = $2) \
               AND ($3::BIGINT IS NULL OR surgeon_id = $3) \
               AND ($4::TEXT IS NULL OR procedure_name ILIKE '%' || $4 || '%') \
             ORDER BY updated_at DESC, id DESC \
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, CaseCard>(&query)
            .bind(facility_id)
            .bind(status.map(CardStatus::as_str))
            .bind(surgeon_id)
            .bind(name_contains)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }
}
