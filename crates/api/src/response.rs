//! Shared response envelope types for API handlers.
//!
//! Every successful response is wrapped in `{ "data": ... }`; errors use
//! `{ "error", "code" }` (see [`crate::error::AppError`]).

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse { data: items }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
