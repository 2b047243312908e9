//! Client for the durable workflow service.
//!
//! This crate provides the user-level `Client` for starting workflows,
//! completing activities asynchronously and reading workflow results, the
//! transport-level `WorkflowService` trait shared with workers, the
//! in-process `LocalWorkflowService`, and the `Starter` helper.

pub mod client;
pub mod local;
pub mod options;
pub mod service;
pub mod starter;

pub use client::*;
pub use local::*;
pub use options::*;
pub use service::*;
pub use starter::*;
