//! Activities of the expense saga.
//!
//! Each activity calls the expense gateway and is safe to retry:
//! creating an existing request and paying a paid one both succeed.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use durable_activity::ActivityContext;
use durable_core::{DataConverter, JsonDataConverter};
use durable_worker::{Activity, ActivityError};
use tracing::{info, warn};

use crate::error::GatewayCallError;
use crate::gateway::ExpenseGateway;

const ID_ALREADY_EXISTS: &str = "ID_ALREADY_EXISTS";

type ActivityFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, ActivityError>> + Send>>;

fn decode_expense_id(input: Option<Vec<u8>>) -> Result<String, ActivityError> {
    let input = input.ok_or_else(|| ActivityError::non_retryable("missing expense id"))?;
    let expense_id: String = JsonDataConverter
        .decode(&input)
        .map_err(|e| ActivityError::non_retryable(e.to_string()))?;
    if expense_id.is_empty() {
        return Err(ActivityError::non_retryable("empty expense id"));
    }
    Ok(expense_id)
}

/// A rejection is final, anything else may succeed on the next attempt
fn to_activity_error(err: GatewayCallError) -> ActivityError {
    match err {
        GatewayCallError::Rejected(code) => ActivityError::non_retryable(code),
        other => ActivityError::retryable(other.to_string()),
    }
}

/// Hand the attempt back to the service instead of calling out on a stopping worker
fn ensure_worker_running(ctx: &ActivityContext) -> Result<(), ActivityError> {
    if ctx.is_worker_stopping() {
        return Err(ActivityError::retryable("worker is stopping"));
    }
    Ok(())
}

/// Records the expense request on the gateway
#[derive(Clone)]
pub struct CreateExpenseActivity {
    gateway: Arc<dyn ExpenseGateway>,
}

impl CreateExpenseActivity {
    pub fn new(gateway: Arc<dyn ExpenseGateway>) -> Self {
        Self { gateway }
    }
}

impl Activity for CreateExpenseActivity {
    fn execute(&self, ctx: &ActivityContext, input: Option<Vec<u8>>) -> ActivityFuture {
        let gateway = self.gateway.clone();
        let attempt = ctx.get_info().attempt;
        let running = ensure_worker_running(ctx);
        Box::pin(async move {
            running?;
            let expense_id = decode_expense_id(input)?;
            match gateway.create_expense(&expense_id).await {
                Ok(()) => info!(expense_id = %expense_id, "expense created"),
                Err(err) if err.code() == Some(ID_ALREADY_EXISTS) => {
                    info!(expense_id = %expense_id, attempt, "expense already exists")
                }
                Err(err) => {
                    warn!(expense_id = %expense_id, attempt, error = %err, "failed to create expense");
                    return Err(to_activity_error(err));
                }
            }
            Ok(Vec::new())
        })
    }
}

/// Registers the task token with the gateway and leaves the result pending
///
/// The gateway completes the activity by token with the decision string.
#[derive(Clone)]
pub struct WaitForDecisionActivity {
    gateway: Arc<dyn ExpenseGateway>,
}

impl WaitForDecisionActivity {
    pub fn new(gateway: Arc<dyn ExpenseGateway>) -> Self {
        Self { gateway }
    }
}

impl Activity for WaitForDecisionActivity {
    fn execute(&self, ctx: &ActivityContext, input: Option<Vec<u8>>) -> ActivityFuture {
        let gateway = self.gateway.clone();
        let task_token = ctx.task_token().clone();
        let remaining = ctx.get_remaining_time();
        Box::pin(async move {
            let expense_id = decode_expense_id(input)?;
            gateway
                .register_callback(&expense_id, &task_token)
                .await
                .map_err(|err| {
                    warn!(expense_id = %expense_id, error = %err, "failed to register callback");
                    to_activity_error(err)
                })?;
            info!(
                expense_id = %expense_id,
                wait_secs = remaining.map(|d| d.as_secs()),
                "callback registered, waiting for decision"
            );
            Err(ActivityError::ResultPending)
        })
    }
}

/// Pays an approved expense request
#[derive(Clone)]
pub struct PaymentActivity {
    gateway: Arc<dyn ExpenseGateway>,
}

impl PaymentActivity {
    pub fn new(gateway: Arc<dyn ExpenseGateway>) -> Self {
        Self { gateway }
    }
}

impl Activity for PaymentActivity {
    fn execute(&self, ctx: &ActivityContext, input: Option<Vec<u8>>) -> ActivityFuture {
        let gateway = self.gateway.clone();
        let running = ensure_worker_running(ctx);
        Box::pin(async move {
            running?;
            let expense_id = decode_expense_id(input)?;
            gateway.pay(&expense_id).await.map_err(|err| {
                warn!(expense_id = %expense_id, error = %err, "payment failed");
                to_activity_error(err)
            })?;
            info!(expense_id = %expense_id, "expense paid");
            Ok(Vec::new())
        })
    }
}
