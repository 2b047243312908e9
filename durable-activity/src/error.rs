//! Activity error type.

use durable_core::{ErrResultPending, TimeoutType};

/// Activity error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActivityError {
    #[error("Activity execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Activity panicked: {0}")]
    Panic(String),
    #[error("Retryable activity error: {0}")]
    Retryable(String),
    #[error("Non-retryable activity error: {0}")]
    NonRetryable(String),
    #[error("Application error: {0}")]
    Application(String),
    #[error("Activity cancelled")]
    Cancelled,
    #[error("Activity timed out: {0}")]
    Timeout(TimeoutType),
    /// The activity handed its task token to a third party; the worker must
    /// not respond and the attempt stays open until completed by token.
    #[error("Activity result is pending - will be completed asynchronously")]
    ResultPending,
}

impl ActivityError {
    /// Create a retryable error
    pub fn retryable(msg: impl Into<String>) -> Self {
        Self::Retryable(msg.into())
    }

    /// Create a non-retryable error
    pub fn non_retryable(msg: impl Into<String>) -> Self {
        Self::NonRetryable(msg.into())
    }

    /// Create an application error
    pub fn application(msg: impl Into<String>) -> Self {
        Self::Application(msg.into())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::NonRetryable(_) | Self::Cancelled | Self::ResultPending
        )
    }

    pub fn is_result_pending(&self) -> bool {
        matches!(self, Self::ResultPending)
    }

    /// Failure reason reported to the service, matched against
    /// `RetryPolicy::non_retryable_error_types`
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ExecutionFailed(_) => "ExecutionFailed",
            Self::Panic(_) => "Panic",
            Self::Retryable(_) => "Retryable",
            Self::NonRetryable(_) => "NonRetryable",
            Self::Application(_) => "Application",
            Self::Cancelled => "Cancelled",
            Self::Timeout(_) => "Timeout",
            Self::ResultPending => "ResultPending",
        }
    }
}

impl From<ErrResultPending> for ActivityError {
    fn from(_: ErrResultPending) -> Self {
        Self::ResultPending
    }
}
