//! Domain types shared by the workflow, the activities and the gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Workflow type the expense saga is registered under
pub const EXPENSE_WORKFLOW: &str = "expense_workflow";
pub const CREATE_EXPENSE_ACTIVITY: &str = "create_expense_activity";
pub const WAIT_FOR_DECISION_ACTIVITY: &str = "wait_for_decision_activity";
pub const PAYMENT_ACTIVITY: &str = "payment_activity";

/// Workflow result after a successful payment
pub const COMPLETED_RESULT: &str = "COMPLETED";

/// Workflow id for the saga handling `expense_id`
pub fn workflow_id_for(expense_id: &str) -> String {
    format!("expense_{}", expense_id)
}

/// Status of an expense request
///
/// Moves only forward: `Created` to `Approved` or `Rejected`, and
/// `Approved` to `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseStatus {
    Created,
    Approved,
    Rejected,
    Completed,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Whether `next` is a legal step forward from this status
    pub fn can_transition_to(&self, next: ExpenseStatus) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Approved)
                | (Self::Created, Self::Rejected)
                | (Self::Approved, Self::Completed)
        )
    }

    /// Human decisions are the statuses that resume a waiting workflow
    pub fn is_decision(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown expense status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for ExpenseStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// One expense request as listed by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRequest {
    pub id: String,
    pub status: ExpenseStatus,
}
