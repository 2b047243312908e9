//! Core types for the durable workflow crates.
//!
//! This module defines the main types used throughout the client and worker
//! for workflow execution, task management, and configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::encoded::EncodingError;

/// Retry policy for activities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Initial retry interval
    pub initial_interval: Duration,
    /// Backoff coefficient (e.g., 2.0 for exponential)
    pub backoff_coefficient: f64,
    /// Maximum retry interval
    pub maximum_interval: Duration,
    /// Maximum number of attempts, 0 means unlimited
    pub maximum_attempts: u32,
    /// Failure reasons that are never retried
    pub non_retryable_error_types: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(100),
            maximum_attempts: 0, // Unlimited
            non_retryable_error_types: vec![],
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (`attempt` is the attempt that just failed, starting at 1)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let secs = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        let capped = if self.maximum_interval.is_zero() {
            secs
        } else {
            secs.min(self.maximum_interval.as_secs_f64())
        };
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Whether another attempt may follow `attempt` for a failure with `reason`
    pub fn should_retry(&self, attempt: u32, reason: &str) -> bool {
        if self
            .non_retryable_error_types
            .iter()
            .any(|r| r == reason)
        {
            return false;
        }
        self.maximum_attempts == 0 || attempt < self.maximum_attempts
    }
}

/// Activity options for scheduling activities
///
/// A zero duration leaves the corresponding timeout unbounded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityOptions {
    /// Task list to schedule activity on (defaults to the workflow's task list)
    pub task_list: String,
    /// Schedule to close timeout, covers every attempt
    pub schedule_to_close_timeout: Duration,
    /// Schedule to start timeout, bounds the wait for a worker to pick up an attempt
    pub schedule_to_start_timeout: Duration,
    /// Start to close timeout, bounds a single attempt once picked up
    pub start_to_close_timeout: Duration,
    /// Retry policy, a single attempt when absent
    pub retry_policy: Option<RetryPolicy>,
}

/// Workflow execution identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub run_id: String,
}

impl WorkflowExecution {
    pub fn new(workflow_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            run_id: run_id.into(),
        }
    }
}

impl fmt::Display for WorkflowExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.workflow_id, self.run_id)
    }
}

/// Workflow type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowType {
    pub name: String,
}

/// Activity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityType {
    pub name: String,
}

/// Workflow information available in workflow context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInfo {
    pub workflow_execution: WorkflowExecution,
    pub workflow_type: WorkflowType,
    pub task_list: String,
    pub attempt: u32,
}

/// Lifecycle state of a workflow execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowExecutionStatus {
    Running,
    Completed,
    Failed,
}

/// Opaque completion token identifying one activity attempt
///
/// Tokens are issued by the service and handed to whoever will complete the
/// activity asynchronously. Outside the process they travel hex encoded.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskToken(Vec<u8>);

impl TaskToken {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Generate a fresh random token
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(encoded: &str) -> Result<Self, EncodingError> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| EncodingError::Deserialization(format!("invalid task token: {}", e)))?;
        if bytes.is_empty() {
            return Err(EncodingError::Deserialization(
                "empty task token".to_string(),
            ));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for TaskToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskToken({})", self.to_hex())
    }
}

impl fmt::Display for TaskToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Worker identity information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    pub name: String,
    pub version: String,
}

impl Default for WorkerIdentity {
    fn default() -> Self {
        Self {
            name: format!(
                "durable-rust-worker@{}-pid-{}",
                std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string()),
                std::process::id()
            ),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
