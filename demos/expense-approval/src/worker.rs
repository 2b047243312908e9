//! Worker and starter bootstrap for the expense saga.

use std::sync::Arc;

use durable_client::{Client, Starter, StarterConfig, WorkflowService};
use durable_core::{DurableResult, WorkflowExecution};
use durable_worker::{DurableWorker, WorkerConfig, WorkerOptions};

use crate::activities::{CreateExpenseActivity, PaymentActivity, WaitForDecisionActivity};
use crate::config::ExpenseConfig;
use crate::error::ExpenseError;
use crate::gateway::ExpenseGateway;
use crate::models::{
    workflow_id_for, CREATE_EXPENSE_ACTIVITY, EXPENSE_WORKFLOW, PAYMENT_ACTIVITY,
    WAIT_FOR_DECISION_ACTIVITY,
};
use crate::workflows::ExpenseWorkflow;

/// Worker configuration registering the expense workflow and its activities
pub fn expense_worker_config(
    config: &ExpenseConfig,
    gateway: Arc<dyn ExpenseGateway>,
    options: WorkerOptions,
) -> WorkerConfig {
    WorkerConfig::new(&config.task_list)
        .with_workflow(EXPENSE_WORKFLOW, ExpenseWorkflow::new(config))
        .with_activity(CREATE_EXPENSE_ACTIVITY, CreateExpenseActivity::new(gateway.clone()))
        .with_activity(
            WAIT_FOR_DECISION_ACTIVITY,
            WaitForDecisionActivity::new(gateway.clone()),
        )
        .with_activity(PAYMENT_ACTIVITY, PaymentActivity::new(gateway))
        .with_options(options)
}

/// Build a validated worker for the expense task list
pub fn build_expense_worker(
    service: Arc<dyn WorkflowService>,
    config: &ExpenseConfig,
    gateway: Arc<dyn ExpenseGateway>,
    options: WorkerOptions,
) -> Result<DurableWorker, ExpenseError> {
    config.validate()?;
    let worker = DurableWorker::new(service, expense_worker_config(config, gateway, options))?;
    Ok(worker)
}

/// Starter bound to the workflow id of `expense_id`
pub fn expense_starter(
    client: Arc<dyn Client>,
    config: &ExpenseConfig,
    expense_id: &str,
) -> DurableResult<Starter> {
    Starter::new(
        client,
        StarterConfig::new(&config.task_list, EXPENSE_WORKFLOW)
            .with_workflow_id(workflow_id_for(expense_id)),
    )
}

/// Start the expense saga for `expense_id`
pub async fn start_expense_workflow(
    client: Arc<dyn Client>,
    config: &ExpenseConfig,
    expense_id: &str,
) -> DurableResult<WorkflowExecution> {
    expense_starter(client, config, expense_id)?
        .start(expense_id)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayCallError;
    use async_trait::async_trait;
    use durable_client::LocalWorkflowService;
    use durable_core::TaskToken;
    use durable_worker::Registry;

    struct NoopGateway;

    #[async_trait]
    impl ExpenseGateway for NoopGateway {
        async fn create_expense(&self, _expense_id: &str) -> Result<(), GatewayCallError> {
            Ok(())
        }

        async fn register_callback(
            &self,
            _expense_id: &str,
            _task_token: &TaskToken,
        ) -> Result<(), GatewayCallError> {
            Ok(())
        }

        async fn pay(&self, _expense_id: &str) -> Result<(), GatewayCallError> {
            Ok(())
        }
    }

    #[test]
    fn test_worker_registers_saga() {
        let worker = build_expense_worker(
            Arc::new(LocalWorkflowService::new()),
            &ExpenseConfig::default(),
            Arc::new(NoopGateway),
            WorkerOptions::default(),
        )
        .unwrap();

        assert_eq!(worker.task_list(), "expenseGroup");
        let activities: Vec<String> = worker
            .registry()
            .get_registered_activities()
            .into_iter()
            .map(|info| info.name)
            .collect();
        assert_eq!(
            activities,
            vec![
                CREATE_EXPENSE_ACTIVITY,
                PAYMENT_ACTIVITY,
                WAIT_FOR_DECISION_ACTIVITY
            ]
        );
        assert!(worker.registry().get_workflow(EXPENSE_WORKFLOW).is_some());
    }

    #[test]
    fn test_invalid_config_rejected_before_worker_built() {
        let config = ExpenseConfig {
            task_list: String::new(),
            ..Default::default()
        };
        let result = build_expense_worker(
            Arc::new(LocalWorkflowService::new()),
            &config,
            Arc::new(NoopGateway),
            WorkerOptions::default(),
        );
        assert!(matches!(result, Err(ExpenseError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_start_uses_expense_workflow_id() {
        let service = Arc::new(LocalWorkflowService::new());
        let client: Arc<dyn Client> = Arc::new(durable_client::WorkflowClient::new(
            service,
            durable_client::ClientOptions::default(),
        ));

        let execution = start_expense_workflow(client.clone(), &ExpenseConfig::default(), "abc")
            .await
            .unwrap();
        assert_eq!(execution.workflow_id, "expense_abc");

        let duplicate =
            start_expense_workflow(client, &ExpenseConfig::default(), "abc").await;
        assert!(duplicate.is_err());
    }
}
