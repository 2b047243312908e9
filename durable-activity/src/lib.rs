//! Activity authoring SDK.
//!
//! This crate provides the API for implementing activities: context access,
//! activity information and the activity error type, including the marker
//! used for asynchronous completion.

pub mod context;
pub mod error;

pub use context::*;
pub use error::*;
