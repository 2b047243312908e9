//! The workflow error type.

use durable_core::{EncodingError, FailureKind, TimeoutError, WorkflowFailure};

/// Workflow error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Activity failed: {0}")]
    ActivityFailed(String),
    #[error("Activity timed out: {0}")]
    ActivityTimeout(TimeoutError),
    #[error("Workflow cancelled")]
    Cancelled,
    #[error("Generic error: {0}")]
    Generic(String),
}

impl WorkflowError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WorkflowError::ActivityTimeout(_))
    }

    /// Terminal failure recorded by the service when the workflow returns this error
    pub fn to_failure(&self) -> WorkflowFailure {
        match self {
            WorkflowError::ActivityTimeout(timeout) => WorkflowFailure::timeout(timeout),
            WorkflowError::ActivityFailed(msg) => {
                WorkflowFailure::new(FailureKind::ActivityFailed, msg.clone())
            }
            other => WorkflowFailure::new(FailureKind::Generic, other.to_string()),
        }
    }
}

impl From<EncodingError> for WorkflowError {
    fn from(err: EncodingError) -> Self {
        WorkflowError::Generic(err.to_string())
    }
}
