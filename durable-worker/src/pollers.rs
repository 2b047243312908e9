//! Task pollers for polling workflow and activity tasks from the service.
//!
//! This module provides the pollers that continuously poll for new tasks
//! and dispatch them for processing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use durable_client::{
    ActivityTask, PollForActivityTaskRequest, PollForWorkflowTaskRequest, WorkflowService,
    WorkflowTask,
};
use durable_core::DurableResult;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error};

use crate::handlers::{ActivityTaskHandler, WorkflowTaskHandler};

const POLL_ERROR_BACKOFF: Duration = Duration::from_millis(200);

/// Task poller trait
#[async_trait]
pub trait TaskPoller: Send + Sync {
    type Task: Send + 'static;

    /// Short name used in logs
    fn kind(&self) -> &'static str;

    /// Poll for a new task
    async fn poll(&self) -> DurableResult<Option<Self::Task>>;

    /// Process a task
    async fn process(&self, task: Self::Task);
}

/// Workflow task poller
pub struct WorkflowTaskPoller {
    service: Arc<dyn WorkflowService>,
    task_list: String,
    identity: String,
    poll_timeout: Duration,
    handler: Arc<WorkflowTaskHandler>,
}

impl WorkflowTaskPoller {
    pub fn new(
        service: Arc<dyn WorkflowService>,
        task_list: impl Into<String>,
        identity: impl Into<String>,
        poll_timeout: Duration,
        handler: Arc<WorkflowTaskHandler>,
    ) -> Self {
        Self {
            service,
            task_list: task_list.into(),
            identity: identity.into(),
            poll_timeout,
            handler,
        }
    }
}

#[async_trait]
impl TaskPoller for WorkflowTaskPoller {
    type Task = WorkflowTask;

    fn kind(&self) -> &'static str {
        "workflow"
    }

    async fn poll(&self) -> DurableResult<Option<Self::Task>> {
        self.service
            .poll_for_workflow_task(PollForWorkflowTaskRequest {
                task_list: self.task_list.clone(),
                identity: self.identity.clone(),
                poll_timeout: self.poll_timeout,
            })
            .await
    }

    async fn process(&self, task: Self::Task) {
        self.handler.handle(task).await
    }
}

/// Activity task poller
pub struct ActivityTaskPoller {
    service: Arc<dyn WorkflowService>,
    task_list: String,
    identity: String,
    poll_timeout: Duration,
    handler: Arc<ActivityTaskHandler>,
}

impl ActivityTaskPoller {
    pub fn new(
        service: Arc<dyn WorkflowService>,
        task_list: impl Into<String>,
        identity: impl Into<String>,
        poll_timeout: Duration,
        handler: Arc<ActivityTaskHandler>,
    ) -> Self {
        Self {
            service,
            task_list: task_list.into(),
            identity: identity.into(),
            poll_timeout,
            handler,
        }
    }
}

#[async_trait]
impl TaskPoller for ActivityTaskPoller {
    type Task = ActivityTask;

    fn kind(&self) -> &'static str {
        "activity"
    }

    async fn poll(&self) -> DurableResult<Option<Self::Task>> {
        self.service
            .poll_for_activity_task(PollForActivityTaskRequest {
                task_list: self.task_list.clone(),
                identity: self.identity.clone(),
                poll_timeout: self.poll_timeout,
            })
            .await
    }

    async fn process(&self, task: Self::Task) {
        self.handler.handle(task).await;
    }
}

/// Poll until `stop` flips, processing each task on its own Tokio task
///
/// A permit from `slots` is held from before the poll until processing ends,
/// so no more tasks are taken than can run at once.
pub async fn run_poller<P>(poller: Arc<P>, slots: Arc<Semaphore>, mut stop: watch::Receiver<bool>)
where
    P: TaskPoller + 'static,
{
    debug!(poller = poller.kind(), "poller started");
    loop {
        if *stop.borrow() {
            break;
        }

        let permit = tokio::select! {
            permit = slots.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            _ = stop.changed() => break,
        };

        let polled = tokio::select! {
            polled = poller.poll() => polled,
            _ = stop.changed() => break,
        };

        match polled {
            Ok(Some(task)) => {
                let poller = poller.clone();
                tokio::spawn(async move {
                    poller.process(task).await;
                    drop(permit);
                });
            }
            Ok(None) => {}
            Err(e) => {
                error!(poller = poller.kind(), error = %e, "error polling task");
                tokio::time::sleep(POLL_ERROR_BACKOFF).await;
            }
        }
    }
    debug!(poller = poller.kind(), "poller stopped");
}
