//! Core types and utilities for the durable workflow crates.
//!
//! This crate provides the foundational types, error handling, and
//! serialization framework shared by the client, worker, workflow and
//! activity crates.

pub mod encoded;
pub mod error;
pub mod types;

pub use encoded::*;
pub use error::*;
pub use types::*;
