//! Workflow authoring SDK.
//!
//! This crate provides the API for implementing workflows: the workflow
//! context, the commands it hands to the runtime and the workflow error type.

pub mod commands;
pub mod context;
pub mod future;

pub use commands::*;
pub use context::*;
pub use future::*;
