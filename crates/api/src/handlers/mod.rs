//! Request handlers.
//!
//! Handlers extract the caller and the request, delegate to the lifecycle
//! services in [`crate::lifecycle`], and wrap results in
//! [`crate::response::DataResponse`].

pub mod case_card;
pub mod feedback;
