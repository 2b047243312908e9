//! Workflow task handler.
//!
//! Runs a workflow function to completion. Commands the workflow emits are
//! forwarded to the service, and the final result or failure is reported back.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use durable_client::{
    RespondWorkflowTaskCompletedRequest, RespondWorkflowTaskFailedRequest,
    ScheduleActivityTaskRequest, WorkflowService, WorkflowTask,
};
use durable_core::{DurableError, FailureKind, WorkflowExecution, WorkflowFailure, WorkflowInfo};
use durable_workflow::{CommandSink, WorkflowCommand, WorkflowContext};
use tracing::{info, warn};

use super::activity::panic_message;
use crate::registry::{Registry, WorkflowError};

/// Map a service error seen while awaiting an activity to what workflow code sees
pub fn to_workflow_error(err: DurableError) -> WorkflowError {
    match err {
        DurableError::Timeout(timeout) => WorkflowError::ActivityTimeout(timeout),
        DurableError::ActivityFailed { reason, details } => {
            WorkflowError::ActivityFailed(format!("{}: {}", reason, details))
        }
        other => WorkflowError::Generic(other.to_string()),
    }
}

/// Command sink that schedules activities on the service
struct ServiceCommandSink {
    service: Arc<dyn WorkflowService>,
    execution: WorkflowExecution,
}

impl CommandSink for ServiceCommandSink {
    fn submit(
        &self,
        command: WorkflowCommand,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>> {
        let service = self.service.clone();
        let execution = self.execution.clone();
        Box::pin(async move {
            match command {
                WorkflowCommand::ScheduleActivity(cmd) => service
                    .schedule_activity_task(ScheduleActivityTaskRequest {
                        workflow_execution: execution,
                        activity_id: cmd.activity_id,
                        activity_type: cmd.activity_type,
                        input: cmd.args,
                        options: cmd.options,
                    })
                    .await
                    .map_err(to_workflow_error),
            }
        })
    }
}

/// Workflow task handler
pub struct WorkflowTaskHandler {
    service: Arc<dyn WorkflowService>,
    registry: Arc<dyn Registry>,
    identity: String,
}

impl WorkflowTaskHandler {
    pub fn new(
        service: Arc<dyn WorkflowService>,
        registry: Arc<dyn Registry>,
        identity: String,
    ) -> Self {
        Self {
            service,
            registry,
            identity,
        }
    }

    /// Handle a workflow task, returning once the execution closed
    pub async fn handle(&self, task: WorkflowTask) {
        let execution = task.workflow_execution.clone();
        let workflow_type = task.workflow_type.name.clone();

        let result = match self.registry.get_workflow(&workflow_type) {
            Some(workflow) => {
                let info = WorkflowInfo {
                    workflow_execution: execution.clone(),
                    workflow_type: task.workflow_type.clone(),
                    task_list: task.task_list.clone(),
                    attempt: task.attempt,
                };
                let sink = Arc::new(ServiceCommandSink {
                    service: self.service.clone(),
                    execution: execution.clone(),
                });
                let ctx = WorkflowContext::with_sink(info, sink);

                info!(
                    workflow_id = %execution.workflow_id,
                    run_id = %execution.run_id,
                    workflow_type = %workflow_type,
                    "running workflow"
                );
                match tokio::spawn(workflow.execute(ctx, task.input)).await {
                    Ok(result) => result.map_err(|e| e.to_failure()),
                    Err(join_error) if join_error.is_panic() => Err(WorkflowFailure::new(
                        FailureKind::Generic,
                        format!("workflow panicked: {}", panic_message(join_error.into_panic())),
                    )),
                    Err(join_error) => Err(WorkflowFailure::new(
                        FailureKind::Generic,
                        format!("workflow task cancelled: {}", join_error),
                    )),
                }
            }
            None => {
                warn!(workflow_type = %workflow_type, "workflow not registered");
                Err(WorkflowFailure::new(
                    FailureKind::Generic,
                    format!("workflow '{}' not registered", workflow_type),
                ))
            }
        };

        let response = match result {
            Ok(output) => {
                self.service
                    .respond_workflow_task_completed(RespondWorkflowTaskCompletedRequest {
                        workflow_execution: execution.clone(),
                        result: Some(output),
                        identity: self.identity.clone(),
                    })
                    .await
            }
            Err(failure) => {
                self.service
                    .respond_workflow_task_failed(RespondWorkflowTaskFailedRequest {
                        workflow_execution: execution.clone(),
                        failure,
                        identity: self.identity.clone(),
                    })
                    .await
            }
        };

        if let Err(e) = response {
            warn!(
                workflow_id = %execution.workflow_id,
                error = %e,
                "failed to report workflow outcome"
            );
        }
    }
}
