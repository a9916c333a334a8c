//! Repository for the `case_card_feedback` table.

use casecard_core::feedback::ReviewAction;
use casecard_core::types::DbId;
use sqlx::postgres::PgExecutor;
use sqlx::PgConnection;

use crate::models::feedback::{Feedback, NewFeedback};

/// Column list for `case_card_feedback` queries.
const COLUMNS: &str = "\
    id, facility_id, case_card_id, surgical_case_id, items_unused, items_missing, \
    setup_issues, staff_comments, suggested_changes, submitted_by_user_id, \
    reviewed_at, reviewed_by_user_id, review_action, review_notes, \
    created_at, updated_at";

pub struct FeedbackRepo;

impl FeedbackRepo {
    /// Insert feedback. A second submission for the same case trips
    /// `uq_case_card_feedback_case`.
    pub async fn insert(conn: &mut PgConnection, input: &NewFeedback) -> Result<Feedback, sqlx::Error> {
        let query = format!(
            "INSERT INTO case_card_feedback \
                (facility_id, case_card_id, surgical_case_id, items_unused, items_missing, \
                 setup_issues, staff_comments, suggested_changes, submitted_by_user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(input.facility_id)
            .bind(input.case_card_id)
            .bind(input.surgical_case_id)
            .bind(&input.items_unused)
            .bind(&input.items_missing)
            .bind(&input.setup_issues)
            .bind(&input.staff_comments)
            .bind(&input.suggested_changes)
            .bind(input.submitted_by_user_id)
            .fetch_one(conn)
            .await
    }

    pub async fn exists_for_case<'e, E: PgExecutor<'e>>(
        executor: E,
        case_card_id: DbId,
        surgical_case_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS( \
                SELECT 1 FROM case_card_feedback \
                WHERE case_card_id = $1 AND surgical_case_id = $2)",
        )
        .bind(case_card_id)
        .bind(surgical_case_id)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        facility_id: DbId,
        id: DbId,
    ) -> Result<Option<Feedback>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM case_card_feedback WHERE id = $1 AND facility_id = $2"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(id)
            .bind(facility_id)
            .fetch_optional(executor)
            .await
    }

    /// Record a review. Returns `None` if the row was already reviewed (or
    /// does not exist), so a concurrent second review cannot overwrite the
    /// first.
    pub async fn review<'e, E: PgExecutor<'e>>(
        executor: E,
        facility_id: DbId,
        id: DbId,
        reviewed_by_user_id: DbId,
        action: ReviewAction,
        notes: Option<&str>,
    ) -> Result<Option<Feedback>, sqlx::Error> {
        let query = format!(
            "UPDATE case_card_feedback SET \
                reviewed_at = NOW(), reviewed_by_user_id = $3, review_action = $4, review_notes = $5 \
             WHERE id = $1 AND facility_id = $2 AND reviewed_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(id)
            .bind(facility_id)
            .bind(reviewed_by_user_id)
            .bind(action.as_str())
            .bind(notes)
            .fetch_optional(executor)
            .await
    }

    /// Feedback for one card, newest first.
    pub async fn list_for_card<'e, E: PgExecutor<'e>>(
        executor: E,
        case_card_id: DbId,
    ) -> Result<Vec<Feedback>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM case_card_feedback \
             WHERE case_card_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(case_card_id)
            .fetch_all(executor)
            .await
    }

    /// Facility-wide feedback, oldest first so the review queue drains in
    /// submission order.
    pub async fn list_for_facility<'e, E: PgExecutor<'e>>(
        executor: E,
        facility_id: DbId,
        pending_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Feedback>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM case_card_feedback \
             WHERE facility_id = $1 AND (NOT $2 OR reviewed_at IS NULL) \
             ORDER BY created_at ASC, id ASC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Feedback>(&query)
            .bind(facility_id)
            .bind(pending_only)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }
}
