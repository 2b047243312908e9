//! The expense approval workflow.
//!
//! Runs create, then waits for a decision, then pays approved requests.
//! The body reads only its input, the options fixed at registration and
//! the activity results it observed.

use std::future::Future;
use std::pin::Pin;

use durable_core::{ActivityOptions, DataConverter, JsonDataConverter};
use durable_worker::{Workflow, WorkflowError};
use durable_workflow::WorkflowContext;
use tracing::info;

use crate::config::ExpenseConfig;
use crate::error::ExpenseError;
use crate::models::{
    ExpenseStatus, COMPLETED_RESULT, CREATE_EXPENSE_ACTIVITY, PAYMENT_ACTIVITY,
    WAIT_FOR_DECISION_ACTIVITY,
};

/// Steps of the expense saga
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseWorkflowState {
    AwaitingCreate,
    AwaitingDecision,
    AwaitingPayment,
    /// Final result, `"COMPLETED"` or empty
    Done(String),
}

/// Expense approval workflow
#[derive(Debug, Clone)]
pub struct ExpenseWorkflow {
    short_options: ActivityOptions,
    decision_options: ActivityOptions,
}

impl ExpenseWorkflow {
    pub fn new(config: &ExpenseConfig) -> Self {
        Self {
            short_options: config.short_activity_options(),
            decision_options: config.decision_activity_options(),
        }
    }

    /// Drive the saga for `expense_id` to its final result
    pub async fn run(&self, ctx: &WorkflowContext, expense_id: &str) -> Result<String, ExpenseError> {
        let workflow_id = ctx.workflow_info().workflow_execution.workflow_id.clone();
        let args = JsonDataConverter
            .encode(expense_id)
            .map_err(|e| ExpenseError::InvalidInput(e.to_string()))?;

        let mut state = ExpenseWorkflowState::AwaitingCreate;
        loop {
            state = match state {
                ExpenseWorkflowState::AwaitingCreate => {
                    ctx.execute_activity(
                        CREATE_EXPENSE_ACTIVITY,
                        Some(args.clone()),
                        self.short_options.clone(),
                    )
                    .await
                    .map_err(|e| ExpenseError::ActivityFailure {
                        activity: CREATE_EXPENSE_ACTIVITY.to_string(),
                        message: e.to_string(),
                    })?;
                    info!(workflow_id = %workflow_id, expense_id, "expense created, waiting for decision");
                    ExpenseWorkflowState::AwaitingDecision
                }
                ExpenseWorkflowState::AwaitingDecision => {
                    let decision = self.wait_for_decision(ctx, expense_id).await?;
                    info!(workflow_id = %workflow_id, expense_id, decision = %decision, "decision received");
                    if decision == ExpenseStatus::Approved.as_str() {
                        ExpenseWorkflowState::AwaitingPayment
                    } else {
                        ExpenseWorkflowState::Done(String::new())
                    }
                }
                ExpenseWorkflowState::AwaitingPayment => {
                    ctx.execute_activity(
                        PAYMENT_ACTIVITY,
                        Some(args.clone()),
                        self.short_options.clone(),
                    )
                    .await
                    .map_err(|e| ExpenseError::ActivityFailure {
                        activity: PAYMENT_ACTIVITY.to_string(),
                        message: e.to_string(),
                    })?;
                    ExpenseWorkflowState::Done(COMPLETED_RESULT.to_string())
                }
                ExpenseWorkflowState::Done(result) => {
                    info!(workflow_id = %workflow_id, expense_id, result = %result, "expense workflow done");
                    return Ok(result);
                }
            };
        }
    }

    /// The decision is the status string the gateway completed the activity with
    async fn wait_for_decision(
        &self,
        ctx: &WorkflowContext,
        expense_id: &str,
    ) -> Result<String, ExpenseError> {
        ctx.execute_activity_typed(
            WAIT_FOR_DECISION_ACTIVITY,
            expense_id,
            self.decision_options.clone(),
        )
        .await
        .map_err(|e| match e {
            WorkflowError::ActivityTimeout(timeout) => ExpenseError::DecisionTimeout(timeout),
            other => ExpenseError::DecisionFailed(other.to_string()),
        })
    }
}

impl Workflow for ExpenseWorkflow {
    fn execute(
        &self,
        ctx: WorkflowContext,
        input: Option<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>> {
        let workflow = self.clone();
        Box::pin(async move {
            let input = input
                .ok_or_else(|| ExpenseError::InvalidInput("missing expense id".to_string()))?;
            let expense_id: String = JsonDataConverter
                .decode(&input)
                .map_err(|e| ExpenseError::InvalidInput(e.to_string()))?;

            let result = workflow.run(&ctx, &expense_id).await?;
            Ok(JsonDataConverter.encode(&result)?)
        })
    }
}
