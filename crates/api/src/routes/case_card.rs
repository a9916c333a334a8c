//! Route definitions for case cards, mounted at `/case-cards`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{case_card, feedback};
use crate::state::AppState;

/// ```text
/// GET    /                                  -> list_case_cards
/// POST   /                                  -> create_case_card
/// GET    /{id}                              -> get_case_card
/// PUT    /{id}                              -> update_case_card
/// DELETE /{id}                              -> delete_case_card
/// POST   /{id}/activate                     -> activate_case_card
/// POST   /{id}/deactivate                   -> deactivate_case_card
/// POST   /{id}/clone                        -> clone_case_card
/// POST   /{id}/revert                       -> revert_case_card
/// GET    /{id}/lock                         -> get_lock
/// POST   /{id}/lock                         -> acquire_lock
/// DELETE /{id}/lock                         -> release_lock
/// GET    /{id}/versions                     -> list_versions
/// GET    /{id}/versions/compare             -> compare_versions
/// GET    /{id}/versions/{version_id}        -> get_version
/// GET    /{id}/edit-log                     -> list_edit_log
/// GET    /{id}/edit-log/verify              -> verify_edit_log
/// GET    /{id}/feedback                     -> list_card_feedback
/// POST   /{id}/feedback                     -> submit_feedback
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(case_card::list_case_cards).post(case_card::create_case_card),
        )
        .route(
            "/{id}",
            get(case_card::get_case_card)
                .put(case_card::update_case_card)
                .delete(case_card::delete_case_card),
        )
        .route("/{id}/activate", post(case_card::activate_case_card))
        .route("/{id}/deactivate", post(case_card::deactivate_case_card))
        .route("/{id}/clone", post(case_card::clone_case_card))
        .route("/{id}/revert", post(case_card::revert_case_card))
        .route(
            "/{id}/lock",
            get(case_card::get_lock)
                .post(case_card::acquire_lock)
                .delete(case_card::release_lock),
        )
        .route("/{id}/versions", get(case_card::list_versions))
        .route("/{id}/versions/compare", get(case_card::compare_versions))
        .route("/{id}/versions/{version_id}", get(case_card::get_version))
        .route("/{id}/edit-log", get(case_card::list_edit_log))
        .route("/{id}/edit-log/verify", get(case_card::verify_edit_log))
        .route(
            "/{id}/feedback",
            get(feedback::list_card_feedback).post(feedback::submit_feedback),
        )
}
