//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the acting user from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires the `ADMIN` role.

pub mod auth;
pub mod rbac;
