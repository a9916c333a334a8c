//! Request extractors whose rejections use the standard error envelope.
//!
//! Request bodies are strict: DTOs carry `#[serde(deny_unknown_fields)]`, and
//! any shape or type mismatch is rejected here with 400 before a lifecycle
//! rule runs.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// `axum::Json` with a 400 `BAD_REQUEST` rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct StrictJson<T>(pub T);

/// `axum::extract::Query` with a 400 `BAD_REQUEST` rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct StrictQuery<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
