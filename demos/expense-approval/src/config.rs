//! Expense saga configuration.

use std::time::Duration;

use durable_core::{ActivityOptions, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::error::ExpenseError;

pub const DEFAULT_TASK_LIST: &str = "expenseGroup";
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8099";

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_task_list() -> String {
    DEFAULT_TASK_LIST.to_string()
}

fn default_activity_timeout_secs() -> u64 {
    60
}

fn default_decision_timeout_secs() -> u64 {
    600
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_retry_policy() -> RetryPolicy {
    RetryPolicy {
        initial_interval: Duration::from_secs(1),
        backoff_coefficient: 2.0,
        maximum_interval: Duration::from_secs(10),
        maximum_attempts: 5,
        non_retryable_error_types: vec!["NonRetryable".to_string()],
    }
}

/// Configuration for the expense saga
///
/// Activity options derived from it are fixed when the worker registers
/// the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseConfig {
    /// Base URL of the expense gateway the activities call
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_task_list")]
    pub task_list: String,
    /// Timeout for create and payment
    #[serde(default = "default_activity_timeout_secs")]
    pub activity_timeout_secs: u64,
    /// How long a request may wait for a human decision
    #[serde(default = "default_decision_timeout_secs")]
    pub decision_timeout_secs: u64,
    #[serde(default = "default_retry_policy")]
    pub retry_policy: RetryPolicy,
    /// How long `/new` waits for the create activity before redirecting
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for ExpenseConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            task_list: default_task_list(),
            activity_timeout_secs: default_activity_timeout_secs(),
            decision_timeout_secs: default_decision_timeout_secs(),
            retry_policy: default_retry_policy(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl ExpenseConfig {
    pub fn validate(&self) -> Result<(), ExpenseError> {
        let url = self.gateway_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ExpenseError::InvalidConfig(format!(
                "gateway url must be http(s), got '{}'",
                self.gateway_url
            )));
        }
        if self.task_list.trim().is_empty() {
            return Err(ExpenseError::InvalidConfig(
                "task list must not be empty".to_string(),
            ));
        }
        if self.activity_timeout_secs == 0 || self.decision_timeout_secs == 0 {
            return Err(ExpenseError::InvalidConfig(
                "activity and decision timeouts must be positive".to_string(),
            ));
        }
        if self.retry_policy.backoff_coefficient < 1.0 {
            return Err(ExpenseError::InvalidConfig(
                "retry backoff coefficient must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn activity_timeout(&self) -> Duration {
        Duration::from_secs(self.activity_timeout_secs)
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_secs(self.decision_timeout_secs)
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Options for create and payment
    pub fn short_activity_options(&self) -> ActivityOptions {
        ActivityOptions {
            task_list: self.task_list.clone(),
            schedule_to_close_timeout: Duration::ZERO,
            schedule_to_start_timeout: self.activity_timeout(),
            start_to_close_timeout: self.activity_timeout(),
            retry_policy: Some(self.retry_policy.clone()),
        }
    }

    /// Options for the decision wait
    ///
    /// Both timeouts are the decision timeout. A retry only repeats a
    /// callback registration that never reached the gateway; an attempt that
    /// waited out its timeout is not retried.
    pub fn decision_activity_options(&self) -> ActivityOptions {
        ActivityOptions {
            task_list: self.task_list.clone(),
            schedule_to_close_timeout: Duration::ZERO,
            schedule_to_start_timeout: self.decision_timeout(),
            start_to_close_timeout: self.decision_timeout(),
            retry_policy: Some(self.retry_policy.clone()),
        }
    }
}
