pub mod case_card;
pub mod feedback;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /case-cards                                  list, create
/// /case-cards/{id}                             get, update, delete
/// /case-cards/{id}/activate|deactivate         status transitions
/// /case-cards/{id}/clone|revert                copy, restore
/// /case-cards/{id}/lock                        status, acquire, release
/// /case-cards/{id}/versions[/...]              history, snapshot, compare
/// /case-cards/{id}/edit-log[/verify]           audit trail
/// /case-cards/{id}/feedback                    list, submit
///
/// /feedback                                    review queue (admin only)
/// /feedback/{id}/review                        review (admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/case-cards", case_card::router())
        .nest("/feedback", feedback::router())
}
