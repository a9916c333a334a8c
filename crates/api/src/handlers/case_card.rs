//! Handlers for `/case-cards`.
//!
//! All endpoints require authentication via [`AuthUser`]. Governance,
//! lock, and status rules are enforced by [`CaseCardLifecycle`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use casecard_core::types::DbId;
use casecard_db::models::case_card::{
    CaseCardListQuery, CloneCaseCard, CreateCaseCard, ReasonRequest, RevertCaseCard,
    UpdateCaseCard,
};
use casecard_db::models::case_card_version::CompareVersionsQuery;
use serde::Serialize;

use crate::error::AppResult;
use crate::extract::{StrictJson, StrictQuery};
use crate::lifecycle::CaseCardLifecycle;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `DELETE /case-cards/{id}/lock`.
#[derive(Debug, Serialize)]
pub struct LockReleased {
    pub released: bool,
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// GET /api/v1/case-cards
pub async fn list_case_cards(
    auth: AuthUser,
    State(state): State<AppState>,
    StrictQuery(query): StrictQuery<CaseCardListQuery>,
) -> AppResult<impl IntoResponse> {
    let cards = CaseCardLifecycle::list(&state.pool, &auth.actor(), &query).await?;
    Ok(Json(DataResponse { data: cards }))
}

/// POST /api/v1/case-cards
///
/// Create a DRAFT card at version 1.0.0.
pub async fn create_case_card(
    auth: AuthUser,
    State(state): State<AppState>,
    StrictJson(input): StrictJson<CreateCaseCard>,
) -> AppResult<impl IntoResponse> {
    let card = CaseCardLifecycle::create(&state.pool, &auth.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: card })))
}

/// GET /api/v1/case-cards/{id}
pub async fn get_case_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let card = CaseCardLifecycle::get(&state.pool, &auth.actor(), id).await?;
    Ok(Json(DataResponse { data: card }))
}

/// PUT /api/v1/case-cards/{id}
///
/// Store a new full content snapshot.
pub async fn update_case_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    StrictJson(input): StrictJson<UpdateCaseCard>,
) -> AppResult<impl IntoResponse> {
    let card = CaseCardLifecycle::update(&state.pool, &auth.actor(), id, input).await?;
    Ok(Json(DataResponse { data: card }))
}

/// DELETE /api/v1/case-cards/{id}
///
/// Soft delete. The owning surgeon only, with a reason in the body.
pub async fn delete_case_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    StrictJson(input): StrictJson<ReasonRequest>,
) -> AppResult<impl IntoResponse> {
    let card = CaseCardLifecycle::delete(&state.pool, &auth.actor(), id, input).await?;
    Ok(Json(DataResponse { data: card }))
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// POST /api/v1/case-cards/{id}/activate
pub async fn activate_case_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let activation = CaseCardLifecycle::activate(&state.pool, &auth.actor(), id).await?;
    Ok(Json(DataResponse { data: activation }))
}

/// POST /api/v1/case-cards/{id}/deactivate
pub async fn deactivate_case_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    StrictJson(input): StrictJson<ReasonRequest>,
) -> AppResult<impl IntoResponse> {
    let card = CaseCardLifecycle::deactivate(&state.pool, &auth.actor(), id, input).await?;
    Ok(Json(DataResponse { data: card }))
}

/// POST /api/v1/case-cards/{id}/clone
pub async fn clone_case_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    StrictJson(input): StrictJson<CloneCaseCard>,
) -> AppResult<impl IntoResponse> {
    let card = CaseCardLifecycle::clone_card(&state.pool, &auth.actor(), id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: card })))
}

/// POST /api/v1/case-cards/{id}/revert
pub async fn revert_case_card(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    StrictJson(input): StrictJson<RevertCaseCard>,
) -> AppResult<impl IntoResponse> {
    let card = CaseCardLifecycle::revert(&state.pool, &auth.actor(), id, input).await?;
    Ok(Json(DataResponse { data: card }))
}

// ---------------------------------------------------------------------------
// Edit lock
// ---------------------------------------------------------------------------

/// GET /api/v1/case-cards/{id}/lock
///
/// `data` is `null` when the card is unlocked.
pub async fn get_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let lock = CaseCardLifecycle::lock_status(&state.pool, &auth.actor(), id).await?;
    Ok(Json(DataResponse { data: lock }))
}

/// POST /api/v1/case-cards/{id}/lock
///
/// Acquire, or refresh when already held by the caller.
pub async fn acquire_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let lock = CaseCardLifecycle::acquire_lock(
        &state.pool,
        &auth.actor(),
        id,
        state.config.lock_duration_mins,
    )
    .await?;
    Ok(Json(DataResponse { data: lock }))
}

/// DELETE /api/v1/case-cards/{id}/lock
pub async fn release_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let released = CaseCardLifecycle::release_lock(&state.pool, &auth.actor(), id).await?;
    Ok(Json(DataResponse {
        data: LockReleased { released },
    }))
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// GET /api/v1/case-cards/{id}/versions
pub async fn list_versions(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let versions = CaseCardLifecycle::versions(&state.pool, &auth.actor(), id).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// GET /api/v1/case-cards/{id}/versions/{version_id}
pub async fn get_version(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((id, version_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let version = CaseCardLifecycle::version(&state.pool, &auth.actor(), id, version_id).await?;
    Ok(Json(DataResponse { data: version }))
}

/// GET /api/v1/case-cards/{id}/versions/compare?from=&to=
pub async fn compare_versions(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    StrictQuery(query): StrictQuery<CompareVersionsQuery>,
) -> AppResult<impl IntoResponse> {
    let comparison =
        CaseCardLifecycle::compare(&state.pool, &auth.actor(), id, query.from, query.to).await?;
    Ok(Json(DataResponse { data: comparison }))
}

/// GET /api/v1/case-cards/{id}/edit-log
pub async fn list_edit_log(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let entries = CaseCardLifecycle::edit_log(&state.pool, &auth.actor(), id).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/case-cards/{id}/edit-log/verify
pub async fn verify_edit_log(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let result = CaseCardLifecycle::verify_edit_log(&state.pool, &auth.actor(), id).await?;
    Ok(Json(DataResponse { data: result }))
}
