use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
}

/// GET /health
///
/// Liveness plus a `SELECT 1` round trip. Always 200 so a load balancer can
/// tell a degraded instance from a dead one.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match casecard_db::health_check(&state.pool).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Database health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    })
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
