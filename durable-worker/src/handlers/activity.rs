//! Activity task handler for processing activity tasks.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use durable_activity::{ActivityContext, ActivityInfo};
use durable_client::{
    ActivityTask, RespondActivityTaskCompletedRequest, RespondActivityTaskFailedRequest,
    WorkflowService,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::registry::{ActivityError, Registry};

/// Outcome of handling one activity task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityTaskOutcome {
    Completed,
    Failed,
    /// No response was sent, the attempt waits for completion by token
    Pending,
}

/// Activity task handler
pub struct ActivityTaskHandler {
    service: Arc<dyn WorkflowService>,
    registry: Arc<dyn Registry>,
    identity: String,
    stop_rx: watch::Receiver<bool>,
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl ActivityTaskHandler {
    pub fn new(
        service: Arc<dyn WorkflowService>,
        registry: Arc<dyn Registry>,
        identity: String,
        stop_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            service,
            registry,
            identity,
            stop_rx,
        }
    }

    /// Handle an activity task
    pub async fn handle(&self, task: ActivityTask) -> ActivityTaskOutcome {
        let activity_type = task.activity_type.clone();
        debug!(
            workflow_id = %task.workflow_execution.workflow_id,
            activity_id = %task.activity_id,
            activity_type = %activity_type,
            attempt = task.attempt,
            "handling activity task"
        );

        let activity = match self.registry.get_activity(&activity_type) {
            Some(a) => a,
            None => {
                warn!(activity_type = %activity_type, "activity not registered");
                self.respond_failed(
                    &task,
                    "ActivityNotRegistered",
                    format!("activity '{}' not registered", activity_type),
                )
                .await;
                return ActivityTaskOutcome::Failed;
            }
        };

        let deadline = (!task.start_to_close_timeout.is_zero())
            .then(|| Instant::now() + task.start_to_close_timeout);
        let activity_info = ActivityInfo {
            activity_id: task.activity_id.clone(),
            activity_type: activity_type.clone(),
            task_token: task.task_token.clone(),
            workflow_execution: task.workflow_execution.clone(),
            task_list: task.task_list.clone(),
            attempt: task.attempt,
            scheduled_time: task.scheduled_time,
            started_time: task.started_time,
            deadline,
        };
        let mut context = ActivityContext::new(activity_info);
        context.set_worker_stop_channel(self.stop_rx.clone());

        // Execute with panic recovery using tokio::spawn
        let future = activity.execute(&context, task.input.clone());
        let result = match tokio::spawn(future).await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                Err(ActivityError::Panic(panic_message(join_error.into_panic())))
            }
            Err(join_error) => Err(ActivityError::ExecutionFailed(format!(
                "activity task cancelled: {}",
                join_error
            ))),
        };

        match result {
            Ok(output) => {
                let response = self
                    .service
                    .respond_activity_task_completed(RespondActivityTaskCompletedRequest {
                        task_token: task.task_token.clone(),
                        result: Some(output),
                        identity: self.identity.clone(),
                    })
                    .await;
                match response {
                    Ok(()) => info!(
                        workflow_id = %task.workflow_execution.workflow_id,
                        activity_type = %activity_type,
                        "activity completed"
                    ),
                    Err(e) => warn!(
                        activity_type = %activity_type,
                        error = %e,
                        "failed to report activity completion"
                    ),
                }
                ActivityTaskOutcome::Completed
            }
            Err(ActivityError::ResultPending) => {
                info!(
                    workflow_id = %task.workflow_execution.workflow_id,
                    activity_type = %activity_type,
                    "activity result pending, waiting for completion by token"
                );
                ActivityTaskOutcome::Pending
            }
            Err(err) => {
                error!(
                    workflow_id = %task.workflow_execution.workflow_id,
                    activity_type = %activity_type,
                    attempt = task.attempt,
                    error = %err,
                    "activity failed"
                );
                self.respond_failed(&task, err.reason(), err.to_string())
                    .await;
                ActivityTaskOutcome::Failed
            }
        }
    }

    async fn respond_failed(&self, task: &ActivityTask, reason: &str, details: String) {
        let response = self
            .service
            .respond_activity_task_failed(RespondActivityTaskFailedRequest {
                task_token: task.task_token.clone(),
                reason: reason.to_string(),
                details,
                identity: self.identity.clone(),
            })
            .await;
        if let Err(e) = response {
            warn!(
                activity_type = %task.activity_type,
                error = %e,
                "failed to report activity failure"
            );
        }
    }
}
