//! Resumes waiting expense workflows once a decision is made.

use std::sync::Arc;

use durable_client::Client;
use durable_core::{DataConverter, DurableError, JsonDataConverter, TaskToken};
use expense_approval::ExpenseStatus;
use thiserror::Error;
use tracing::{info, warn};

use crate::store::Transition;

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("failed to deliver decision for expense '{expense_id}': {source}")]
    DeliveryFailure {
        expense_id: String,
        #[source]
        source: DurableError,
    },
}

/// Completes the decision activity of a waiting workflow by task token
#[derive(Clone)]
pub struct DecisionNotifier {
    client: Arc<dyn Client>,
}

impl DecisionNotifier {
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self { client }
    }

    /// Complete the activity behind `token` with `status` as its result
    pub async fn resume(
        &self,
        expense_id: &str,
        token: &TaskToken,
        status: ExpenseStatus,
    ) -> Result<(), ResumeError> {
        let delivery_failure = |source: DurableError| ResumeError::DeliveryFailure {
            expense_id: expense_id.to_string(),
            source,
        };
        let payload = JsonDataConverter
            .encode(status.as_str())
            .map_err(|e| delivery_failure(e.into()))?;
        self.client
            .complete_activity(token, Some(&payload), None)
            .await
            .map_err(delivery_failure)
    }

    /// Run the resume step for a committed transition
    ///
    /// Failures are logged and never undo the transition.
    pub async fn notify(&self, expense_id: &str, transition: &Transition) {
        let Some(token) = &transition.token else {
            if transition.changed && transition.status.is_decision() {
                info!(expense_id = %expense_id, "no workflow waiting for this decision");
            }
            return;
        };

        match self.resume(expense_id, token, transition.status).await {
            Ok(()) => info!(
                expense_id = %expense_id,
                decision = %transition.status,
                "workflow resumed"
            ),
            Err(e) => warn!(expense_id = %expense_id, error = %e, "failed to resume workflow"),
        }
    }
}
