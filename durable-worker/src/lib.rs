//! Worker implementation for the durable workflow SDK.
//!
//! This crate provides the worker for hosting workflow and activity
//! implementations, polling tasks from the service, and executing them.

pub mod handlers;
pub mod pollers;
pub mod registry;
pub mod worker;

pub use handlers::*;
pub use pollers::*;
pub use registry::*;
pub use worker::*;
