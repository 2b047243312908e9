//! Error types for the expense saga.

use durable_core::{DurableError, TimeoutError};
use durable_worker::{WorkerError, WorkflowError};
use thiserror::Error;

/// Failure talking to the expense gateway over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayCallError {
    /// The request never produced a response
    #[error("gateway unreachable: {0}")]
    Transport(String),

    /// The gateway answered with an `ERROR:<code>` body
    #[error("gateway rejected request: {0}")]
    Rejected(String),

    #[error("unexpected gateway response: {0}")]
    UnexpectedResponse(String),
}

impl GatewayCallError {
    /// Rejection code, for example `ID_ALREADY_EXISTS`
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected(code) => Some(code),
            _ => None,
        }
    }
}

/// Errors of the expense saga
#[derive(Debug, Error)]
pub enum ExpenseError {
    /// Create or payment failed after the service gave up retrying
    #[error("{activity} failed: {message}")]
    ActivityFailure { activity: String, message: String },

    /// Nobody decided within the decision timeout
    #[error("decision timed out: {0}")]
    DecisionTimeout(TimeoutError),

    /// Callback registration failed or the decision could not be read
    #[error("decision failed: {0}")]
    DecisionFailed(String),

    #[error("invalid workflow input: {0}")]
    InvalidInput(String),

    #[error("invalid expense configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Client(#[from] DurableError),
}

impl From<ExpenseError> for WorkflowError {
    fn from(err: ExpenseError) -> Self {
        match err {
            ExpenseError::DecisionTimeout(timeout) => WorkflowError::ActivityTimeout(timeout),
            err @ (ExpenseError::ActivityFailure { .. } | ExpenseError::DecisionFailed(_)) => {
                WorkflowError::ActivityFailed(err.to_string())
            }
            other => WorkflowError::Generic(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use durable_core::TimeoutType;

    #[test]
    fn test_decision_timeout_stays_a_timeout() {
        let timeout = TimeoutError::new(TimeoutType::StartToClose, "wait_for_decision_activity");
        let err: WorkflowError = ExpenseError::DecisionTimeout(timeout).into();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_activity_failure_maps_to_activity_failed() {
        let err: WorkflowError = ExpenseError::ActivityFailure {
            activity: "payment_activity".into(),
            message: "declined".into(),
        }
        .into();
        assert_eq!(
            err,
            WorkflowError::ActivityFailed("payment_activity failed: declined".into())
        );
    }

    #[test]
    fn test_rejection_code() {
        assert_eq!(
            GatewayCallError::Rejected("INVALID_STATE".into()).code(),
            Some("INVALID_STATE")
        );
        assert_eq!(GatewayCallError::Transport("refused".into()).code(), None);
    }
}
