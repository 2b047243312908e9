//! Task handlers for processing workflow and activity tasks.
//!
//! This module provides handlers that process tasks polled from the service.

pub mod activity;
pub mod workflow;

pub use activity::{ActivityTaskHandler, ActivityTaskOutcome};
pub use workflow::{to_workflow_error, WorkflowTaskHandler};
