//! Identity context.
//!
//! - [`jwt`] -- JWT access-token generation and validation.

pub mod jwt;
