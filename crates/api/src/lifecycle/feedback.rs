//! Post-case feedback and its one-shot admin review.

use casecard_core::error::CoreError;
use casecard_core::feedback::{validate_items, validate_reviewable, validate_text};
use casecard_core::governance::{authorize, Action, Actor};
use casecard_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use casecard_core::types::DbId;
use casecard_db::models::feedback::{
    Feedback, FeedbackQueueQuery, NewFeedback, ReviewFeedback, SubmitFeedback,
};
use casecard_db::repositories::{CaseCardRepo, FeedbackRepo, SurgicalCaseRepo};
use sqlx::PgPool;

use crate::error::{is_unique_violation, AppError, AppResult};

const DUPLICATE_CONSTRAINT: &str = "uq_case_card_feedback_case";

pub struct FeedbackWorkflow;

impl FeedbackWorkflow {
    /// Record feedback for one surgical case performed with a card.
    pub async fn submit(
        pool: &PgPool,
        actor: &Actor,
        case_card_id: DbId,
        input: SubmitFeedback,
    ) -> AppResult<Feedback> {
        authorize(actor, Action::SubmitFeedback, None)?;

        let new = NewFeedback {
            facility_id: actor.facility_id,
            case_card_id,
            surgical_case_id: input.surgical_case_id,
            items_unused: validate_items("items_unused", &input.items_unused)?,
            items_missing: validate_items("items_missing", &input.items_missing)?,
            setup_issues: validate_text("setup_issues", input.setup_issues.as_deref())?,
            staff_comments: validate_text("staff_comments", input.staff_comments.as_deref())?,
            suggested_changes: validate_text(
                "suggested_changes",
                input.suggested_changes.as_deref(),
            )?,
            submitted_by_user_id: actor.user_id,
        };

        CaseCardRepo::find_by_id(pool, actor.facility_id, case_card_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "case_card",
                id: case_card_id,
            })?;
        CaseCardRepo::clear_expired_lock(pool, case_card_id, chrono::Utc::now()).await?;
        SurgicalCaseRepo::find_by_id(pool, actor.facility_id, input.surgical_case_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "surgical_case",
                id: input.surgical_case_id,
            })?;

        if FeedbackRepo::exists_for_case(pool, case_card_id, input.surgical_case_id).await? {
            return Err(duplicate(input.surgical_case_id));
        }

        let mut conn = pool.acquire().await?;
        let feedback = match FeedbackRepo::insert(&mut conn, &new).await {
            Ok(feedback) => feedback,
            // Lost a race with a concurrent submission for the same case.
            Err(err) if is_unique_violation(&err, DUPLICATE_CONSTRAINT) => {
                return Err(duplicate(input.surgical_case_id));
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            user_id = actor.user_id,
            case_card_id,
            feedback_id = feedback.id,
            surgical_case_id = feedback.surgical_case_id,
            "Feedback submitted"
        );

        Ok(feedback)
    }

    /// Record the review outcome. A review is never revised.
    pub async fn review(
        pool: &PgPool,
        actor: &Actor,
        feedback_id: DbId,
        input: ReviewFeedback,
    ) -> AppResult<Feedback> {
        authorize(actor, Action::ReviewFeedback, None)?;
        let notes = validate_text("notes", input.notes.as_deref())?;

        let reviewed = FeedbackRepo::review(
            pool,
            actor.facility_id,
            feedback_id,
            actor.user_id,
            input.action,
            notes.as_deref(),
        )
        .await?;

        let Some(feedback) = reviewed else {
            // Either missing or already reviewed; find out which.
            let existing = FeedbackRepo::find_by_id(pool, actor.facility_id, feedback_id)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "feedback",
                    id: feedback_id,
                })?;
            validate_reviewable(existing.reviewed_at)?;
            return Err(AppError::InternalError(format!(
                "Feedback {feedback_id} could not be reviewed"
            )));
        };

        tracing::info!(
            user_id = actor.user_id,
            feedback_id,
            action = %input.action,
            "Feedback reviewed"
        );

        Ok(feedback)
    }

    /// All feedback for one card, newest first.
    pub async fn list_for_card(
        pool: &PgPool,
        actor: &Actor,
        case_card_id: DbId,
    ) -> AppResult<Vec<Feedback>> {
        CaseCardRepo::find_by_id(pool, actor.facility_id, case_card_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "case_card",
                id: case_card_id,
            })?;
        Ok(FeedbackRepo::list_for_card(pool, case_card_id).await?)
    }

    /// The facility review queue, oldest first.
    pub async fn queue(
        pool: &PgPool,
        actor: &Actor,
        query: &FeedbackQueueQuery,
    ) -> AppResult<Vec<Feedback>> {
        let limit = clamp_limit(query.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
        let offset = clamp_offset(query.offset);
        Ok(FeedbackRepo::list_for_facility(pool, actor.facility_id, query.pending, limit, offset).await?)
    }
}

fn duplicate(surgical_case_id: DbId) -> AppError {
    CoreError::Validation(format!(
        "Feedback for surgical case {surgical_case_id} has already been submitted for this case card"
    ))
    .into()
}
