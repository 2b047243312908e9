//! Error types for the durable workflow crates.
//!
//! This module defines the errors that can surface when starting workflows,
//! completing activities and reading workflow results.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::encoded::EncodingError;

/// Error type for timeouts
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("TimeoutError: timeout_type={timeout_type}, activity_type={activity_type}")]
pub struct TimeoutError {
    pub timeout_type: TimeoutType,
    pub activity_type: String,
}

impl TimeoutError {
    pub fn new(timeout_type: TimeoutType, activity_type: impl Into<String>) -> Self {
        Self {
            timeout_type,
            activity_type: activity_type.into(),
        }
    }

    pub fn timeout_type(&self) -> TimeoutType {
        self.timeout_type
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutType {
    StartToClose,
    ScheduleToStart,
    ScheduleToClose,
}

impl fmt::Display for TimeoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutType::StartToClose => write!(f, "START_TO_CLOSE"),
            TimeoutType::ScheduleToStart => write!(f, "SCHEDULE_TO_START"),
            TimeoutType::ScheduleToClose => write!(f, "SCHEDULE_TO_CLOSE"),
        }
    }
}

/// Result pending error - for async activity completion
///
/// Returned by an activity that handed its task token to a third party and
/// will be completed later through `Client::complete_activity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("ErrResultPending")]
pub struct ErrResultPending;

/// Server error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error("EntityNotExistsError: {message}")]
    EntityNotExists { message: String },

    #[error("BadRequestError: {message}")]
    BadRequest { message: String },

    #[error("WorkflowExecutionAlreadyStartedError: {message}")]
    WorkflowExecutionAlreadyStarted { message: String },

    #[error("ServiceBusyError: {message}")]
    ServiceBusy { message: String },

    #[error("InternalServiceError: {message}")]
    InternalService { message: String },
}

/// Category of a workflow failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// An activity failed and the workflow gave up
    ActivityFailed,
    /// An activity or the workflow itself exceeded a timeout
    Timeout,
    /// Closed from outside through `terminate_workflow`
    Terminated,
    /// Panics, decoding errors and other workflow-level failures
    Generic,
}

/// Terminal failure recorded for a closed workflow execution
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("WorkflowFailure: kind={kind:?}, message={message}")]
pub struct WorkflowFailure {
    pub kind: FailureKind,
    pub message: String,
    pub timeout_type: Option<TimeoutType>,
}

impl WorkflowFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timeout_type: None,
        }
    }

    pub fn timeout(timeout: &TimeoutError) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: timeout.to_string(),
            timeout_type: Some(timeout.timeout_type),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == FailureKind::Timeout
    }
}

/// Main error type that encompasses all client-visible errors
#[derive(Debug, Error)]
pub enum DurableError {
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Workflow execution failed: {0}")]
    WorkflowFailed(WorkflowFailure),

    #[error("Activity task failed: reason={reason}, details={details}")]
    ActivityFailed { reason: String, details: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<EncodingError> for DurableError {
    fn from(err: EncodingError) -> Self {
        DurableError::Serialization(err.to_string())
    }
}

pub type DurableResult<T> = Result<T, DurableError>;

/// Helper functions to check error types
pub fn is_timeout_error(err: &DurableError) -> bool {
    match err {
        DurableError::Timeout(_) => true,
        DurableError::WorkflowFailed(failure) => failure.is_timeout(),
        _ => false,
    }
}

pub fn is_entity_not_exists_error(err: &DurableError) -> bool {
    matches!(
        err,
        DurableError::Server(ServerError::EntityNotExists { .. })
    )
}

pub fn is_workflow_execution_already_started_error(err: &DurableError) -> bool {
    matches!(
        err,
        DurableError::Server(ServerError::WorkflowExecutionAlreadyStarted { .. })
    )
}

pub fn is_workflow_failed_error(err: &DurableError) -> bool {
    matches!(err, DurableError::WorkflowFailed(_))
}

pub fn is_activity_failed_error(err: &DurableError) -> bool {
    matches!(err, DurableError::ActivityFailed { .. })
}
