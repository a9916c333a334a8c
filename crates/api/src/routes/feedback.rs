//! Route definitions for the feedback review queue, mounted at `/feedback`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::feedback;
use crate::state::AppState;

/// ```text
/// GET    /                 -> review_queue (admin only)
/// POST   /{id}/review      -> review_feedback (admin only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(feedback::review_queue))
        .route("/{id}/review", post(feedback::review_feedback))
}
