//! Handlers for post-case feedback.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use casecard_core::types::DbId;
use casecard_db::models::feedback::{FeedbackQueueQuery, ReviewFeedback, SubmitFeedback};

use crate::error::AppResult;
use crate::extract::{StrictJson, StrictQuery};
use crate::lifecycle::feedback::FeedbackWorkflow;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/case-cards/{id}/feedback
pub async fn list_card_feedback(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let feedback = FeedbackWorkflow::list_for_card(&state.pool, &auth.actor(), id).await?;
    Ok(Json(DataResponse { data: feedback }))
}

/// POST /api/v1/case-cards/{id}/feedback
pub async fn submit_feedback(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    StrictJson(input): StrictJson<SubmitFeedback>,
) -> AppResult<impl IntoResponse> {
    let feedback = FeedbackWorkflow::submit(&state.pool, &auth.actor(), id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: feedback })))
}

/// GET /api/v1/feedback?pending=true
///
/// Facility review queue. Admin only.
pub async fn review_queue(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    StrictQuery(query): StrictQuery<FeedbackQueueQuery>,
) -> AppResult<impl IntoResponse> {
    let feedback = FeedbackWorkflow::queue(&state.pool, &admin.actor(), &query).await?;
    Ok(Json(DataResponse { data: feedback }))
}

/// POST /api/v1/feedback/{id}/review
pub async fn review_feedback(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    StrictJson(input): StrictJson<ReviewFeedback>,
) -> AppResult<impl IntoResponse> {
    let feedback = FeedbackWorkflow::review(&state.pool, &auth.actor(), id, input).await?;
    Ok(Json(DataResponse { data: feedback }))
}
