//! Gateway error types.
//!
//! API callers branch on the body text, so rejections are plain-text
//! `ERROR:<code>` bodies with status 200. Only a failed workflow start is
//! reported as a server error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use expense_approval::{ExpenseError, GatewayCallError};
use thiserror::Error;
use tracing::warn;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("expense '{0}' already exists")]
    DuplicateId(String),

    #[error("unknown expense id '{0}'")]
    UnknownId(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Missing or malformed `task_token` form field
    #[error("invalid form data: {0}")]
    InvalidFormData(String),

    /// Unknown `type` on `/action`
    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("failed to start workflow: {0}")]
    StartFailed(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateId(_) => "ID_ALREADY_EXISTS",
            Self::UnknownId(_) => "INVALID_ID",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::InvalidFormData(_) => "INVALID_FORM_DATA",
            Self::InvalidAction(_) => "INVALID_ACTION",
            Self::StartFailed(_) => "START_FAILED",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::StartFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        }
    }

    /// Response body, for example `ERROR:INVALID_ID`
    pub fn body(&self) -> String {
        format!("ERROR:{}", self.code())
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateId(id) => Self::DuplicateId(id),
            StoreError::UnknownId(id) => Self::UnknownId(id),
            err @ StoreError::InvalidState { .. } => Self::InvalidState(err.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        warn!(code = self.code(), error = %self, "request rejected");
        (self.status_code(), self.body()).into_response()
    }
}

/// Errors while wiring up the server
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Expense(#[from] ExpenseError),

    #[error(transparent)]
    Gateway(#[from] GatewayCallError),

    #[error("worker error: {0}")]
    Worker(#[from] durable_worker::WorkerError),
}
