//! Post-case feedback model and DTOs.

use casecard_core::feedback::ReviewAction;
use casecard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `case_card_feedback` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Feedback {
    pub id: DbId,
    pub facility_id: DbId,
    pub case_card_id: DbId,
    pub surgical_case_id: DbId,
    pub items_unused: Vec<String>,
    pub items_missing: Vec<String>,
    pub setup_issues: Option<String>,
    pub staff_comments: Option<String>,
    pub suggested_changes: Option<String>,
    pub submitted_by_user_id: DbId,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by_user_id: Option<DbId>,
    pub review_action: Option<String>,
    pub review_notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Validated feedback ready to insert.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub facility_id: DbId,
    pub case_card_id: DbId,
    pub surgical_case_id: DbId,
    pub items_unused: Vec<String>,
    pub items_missing: Vec<String>,
    pub setup_issues: Option<String>,
    pub staff_comments: Option<String>,
    pub suggested_changes: Option<String>,
    pub submitted_by_user_id: DbId,
}

/// Body for `POST /case-cards/{id}/feedback`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitFeedback {
    pub surgical_case_id: DbId,
    #[serde(default)]
    pub items_unused: Vec<String>,
    #[serde(default)]
    pub items_missing: Vec<String>,
    pub setup_issues: Option<String>,
    pub staff_comments: Option<String>,
    pub suggested_changes: Option<String>,
}

/// Body for `POST /feedback/{id}/review`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewFeedback {
    pub action: ReviewAction,
    pub notes: Option<String>,
}

/// Query for `GET /feedback`.
#[derive(Debug, Default, Deserialize)]
pub struct FeedbackQueueQuery {
    #[serde(default)]
    pub pending: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
