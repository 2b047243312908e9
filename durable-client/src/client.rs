//! Client implementation for the durable workflow service.
//!
//! This module provides the main client interface for starting workflows,
//! completing activities out of band and reading workflow results.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use durable_core::{DurableError, DurableResult, TaskToken, WorkflowExecution, WorkflowType};
use tracing::{debug, info};
use uuid::Uuid;

use crate::options::ClientOptions;
use crate::service::{
    DescribeWorkflowExecutionResponse, RespondActivityTaskCompletedRequest,
    RespondActivityTaskFailedRequest, StartWorkflowExecutionRequest,
    TerminateWorkflowExecutionRequest, WorkflowService,
};

/// Client trait for workflow operations
#[async_trait]
pub trait Client: Send + Sync {
    /// Start a workflow execution
    async fn start_workflow(
        &self,
        options: StartWorkflowOptions,
        workflow_type: &str,
        args: Option<&[u8]>,
    ) -> DurableResult<WorkflowExecution>;

    /// Terminate a running workflow execution
    async fn terminate_workflow(
        &self,
        workflow_id: &str,
        run_id: Option<&str>,
        reason: &str,
    ) -> DurableResult<()>;

    /// Complete an activity (for async completion)
    ///
    /// With `error` set the attempt is failed instead and `result` is ignored.
    async fn complete_activity(
        &self,
        task_token: &TaskToken,
        result: Option<&[u8]>,
        error: Option<DurableError>,
    ) -> DurableResult<()>;

    /// Wait for a workflow execution to close and return its result
    async fn get_workflow_result(
        &self,
        execution: &WorkflowExecution,
    ) -> DurableResult<Option<Vec<u8>>>;

    /// Describe a workflow execution
    async fn describe_workflow_execution(
        &self,
        execution: &WorkflowExecution,
    ) -> DurableResult<DescribeWorkflowExecutionResponse>;
}

/// Options for starting a workflow
#[derive(Debug, Clone, Default)]
pub struct StartWorkflowOptions {
    /// Workflow id, generated when empty
    pub id: String,
    pub task_list: String,
    pub execution_start_to_close_timeout: Option<Duration>,
    pub cron_schedule: Option<String>,
}

/// Workflow client implementation
#[derive(Clone)]
pub struct WorkflowClient {
    pub(crate) service: Arc<dyn WorkflowService>,
    pub(crate) options: ClientOptions,
}

impl WorkflowClient {
    /// Create a new WorkflowClient from an existing service
    pub fn new(service: Arc<dyn WorkflowService>, options: ClientOptions) -> Self {
        Self { service, options }
    }

    pub fn service(&self) -> &Arc<dyn WorkflowService> {
        &self.service
    }
}

#[async_trait]
impl Client for WorkflowClient {
    async fn start_workflow(
        &self,
        options: StartWorkflowOptions,
        workflow_type: &str,
        args: Option<&[u8]>,
    ) -> DurableResult<WorkflowExecution> {
        if options.task_list.is_empty() {
            return Err(DurableError::InvalidArgument(
                "task list is required".to_string(),
            ));
        }
        let workflow_id = if options.id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            options.id
        };

        let request = StartWorkflowExecutionRequest {
            workflow_id: workflow_id.clone(),
            workflow_type: WorkflowType {
                name: workflow_type.to_string(),
            },
            task_list: options.task_list,
            input: args.map(|a| a.to_vec()),
            execution_start_to_close_timeout: options.execution_start_to_close_timeout,
            cron_schedule: options.cron_schedule,
            identity: self.options.identity.clone(),
            request_id: Uuid::new_v4().to_string(),
        };

        let response = self.service.start_workflow_execution(request).await?;
        Ok(WorkflowExecution::new(workflow_id, response.run_id))
    }

    async fn terminate_workflow(
        &self,
        workflow_id: &str,
        run_id: Option<&str>,
        reason: &str,
    ) -> DurableResult<()> {
        self.service
            .terminate_workflow_execution(TerminateWorkflowExecutionRequest {
                workflow_id: workflow_id.to_string(),
                run_id: run_id.map(|r| r.to_string()),
                reason: reason.to_string(),
                identity: self.options.identity.clone(),
            })
            .await
    }

    async fn complete_activity(
        &self,
        task_token: &TaskToken,
        result: Option<&[u8]>,
        error: Option<DurableError>,
    ) -> DurableResult<()> {
        if task_token.is_empty() {
            return Err(DurableError::InvalidArgument(
                "task token is required".to_string(),
            ));
        }

        if let Some(err) = error {
            let request = RespondActivityTaskFailedRequest {
                task_token: task_token.clone(),
                reason: "CompletedWithError".to_string(),
                details: err.to_string(),
                identity: self.options.identity.clone(),
            };
            self.service.respond_activity_task_failed(request).await?;
        } else {
            let request = RespondActivityTaskCompletedRequest {
                task_token: task_token.clone(),
                result: result.map(|r| r.to_vec()),
                identity: self.options.identity.clone(),
            };
            self.service.respond_activity_task_completed(request).await?;
        }

        debug!(task_token = %task_token, "activity completed by token");
        Ok(())
    }

    async fn get_workflow_result(
        &self,
        execution: &WorkflowExecution,
    ) -> DurableResult<Option<Vec<u8>>> {
        let result = self
            .service
            .get_workflow_execution_result(execution.clone())
            .await;
        match &result {
            Ok(_) => info!(workflow_id = %execution.workflow_id, "workflow result received"),
            Err(e) => info!(workflow_id = %execution.workflow_id, error = %e, "workflow closed with error"),
        }
        result
    }

    async fn describe_workflow_execution(
        &self,
        execution: &WorkflowExecution,
    ) -> DurableResult<DescribeWorkflowExecutionResponse> {
        self.service
            .describe_workflow_execution(execution.clone())
            .await
    }
}
