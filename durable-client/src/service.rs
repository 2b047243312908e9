//! Transport-level workflow service API.
//!
//! Workers and clients talk to the durable execution service exclusively
//! through the `WorkflowService` trait. The request and response types here
//! are the wire shapes of that conversation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use durable_core::{
    ActivityOptions, DurableResult, TaskToken, WorkflowExecution, WorkflowExecutionStatus,
    WorkflowFailure, WorkflowType,
};

#[derive(Debug, Clone)]
pub struct StartWorkflowExecutionRequest {
    pub workflow_id: String,
    pub workflow_type: WorkflowType,
    pub task_list: String,
    pub input: Option<Vec<u8>>,
    pub execution_start_to_close_timeout: Option<Duration>,
    pub cron_schedule: Option<String>,
    pub identity: String,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartWorkflowExecutionResponse {
    pub run_id: String,
}

#[derive(Debug, Clone)]
pub struct PollForWorkflowTaskRequest {
    pub task_list: String,
    pub identity: String,
    pub poll_timeout: Duration,
}

/// A workflow execution handed to a worker to run
#[derive(Debug, Clone)]
pub struct WorkflowTask {
    pub workflow_execution: WorkflowExecution,
    pub workflow_type: WorkflowType,
    pub task_list: String,
    pub input: Option<Vec<u8>>,
    pub attempt: u32,
}

#[derive(Debug, Clone)]
pub struct RespondWorkflowTaskCompletedRequest {
    pub workflow_execution: WorkflowExecution,
    pub result: Option<Vec<u8>>,
    pub identity: String,
}

#[derive(Debug, Clone)]
pub struct RespondWorkflowTaskFailedRequest {
    pub workflow_execution: WorkflowExecution,
    pub failure: WorkflowFailure,
    pub identity: String,
}

#[derive(Debug, Clone)]
pub struct TerminateWorkflowExecutionRequest {
    pub workflow_id: String,
    pub run_id: Option<String>,
    pub reason: String,
    pub identity: String,
}

/// Request to run one activity on behalf of a workflow execution
#[derive(Debug, Clone)]
pub struct ScheduleActivityTaskRequest {
    pub workflow_execution: WorkflowExecution,
    pub activity_id: String,
    pub activity_type: String,
    pub input: Option<Vec<u8>>,
    pub options: ActivityOptions,
}

#[derive(Debug, Clone)]
pub struct PollForActivityTaskRequest {
    pub task_list: String,
    pub identity: String,
    pub poll_timeout: Duration,
}

/// One activity attempt handed to a worker
#[derive(Debug, Clone)]
pub struct ActivityTask {
    pub task_token: TaskToken,
    pub workflow_execution: WorkflowExecution,
    pub activity_id: String,
    pub activity_type: String,
    pub task_list: String,
    pub input: Option<Vec<u8>>,
    pub attempt: u32,
    pub scheduled_time: DateTime<Utc>,
    pub started_time: DateTime<Utc>,
    pub start_to_close_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RespondActivityTaskCompletedRequest {
    pub task_token: TaskToken,
    pub result: Option<Vec<u8>>,
    pub identity: String,
}

#[derive(Debug, Clone)]
pub struct RespondActivityTaskFailedRequest {
    pub task_token: TaskToken,
    pub reason: String,
    pub details: String,
    pub identity: String,
}

#[derive(Debug, Clone)]
pub struct PendingActivityInfo {
    pub activity_id: String,
    pub activity_type: String,
    pub attempt: u32,
}

#[derive(Debug, Clone)]
pub struct DescribeWorkflowExecutionResponse {
    pub workflow_execution: WorkflowExecution,
    pub workflow_type: WorkflowType,
    pub task_list: String,
    pub status: WorkflowExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub close_time: Option<DateTime<Utc>>,
    pub pending_activities: Vec<PendingActivityInfo>,
}

/// Workflow service trait
#[async_trait]
pub trait WorkflowService: Send + Sync {
    async fn start_workflow_execution(
        &self,
        request: StartWorkflowExecutionRequest,
    ) -> DurableResult<StartWorkflowExecutionResponse>;

    async fn terminate_workflow_execution(
        &self,
        request: TerminateWorkflowExecutionRequest,
    ) -> DurableResult<()>;

    /// Long-poll for a workflow task, `None` when the poll times out
    async fn poll_for_workflow_task(
        &self,
        request: PollForWorkflowTaskRequest,
    ) -> DurableResult<Option<WorkflowTask>>;

    async fn respond_workflow_task_completed(
        &self,
        request: RespondWorkflowTaskCompletedRequest,
    ) -> DurableResult<()>;

    async fn respond_workflow_task_failed(
        &self,
        request: RespondWorkflowTaskFailedRequest,
    ) -> DurableResult<()>;

    /// Schedule an activity and wait until it resolves, fails for good or times out
    async fn schedule_activity_task(
        &self,
        request: ScheduleActivityTaskRequest,
    ) -> DurableResult<Vec<u8>>;

    /// Long-poll for an activity task, `None` when the poll times out
    async fn poll_for_activity_task(
        &self,
        request: PollForActivityTaskRequest,
    ) -> DurableResult<Option<ActivityTask>>;

    async fn respond_activity_task_completed(
        &self,
        request: RespondActivityTaskCompletedRequest,
    ) -> DurableResult<()>;

    async fn respond_activity_task_failed(
        &self,
        request: RespondActivityTaskFailedRequest,
    ) -> DurableResult<()>;

    /// Wait for the execution to close and return its result
    ///
    /// An empty `run_id` refers to the latest run of the workflow id.
    async fn get_workflow_execution_result(
        &self,
        execution: WorkflowExecution,
    ) -> DurableResult<Option<Vec<u8>>>;

    async fn describe_workflow_execution(
        &self,
        execution: WorkflowExecution,
    ) -> DurableResult<DescribeWorkflowExecutionResponse>;
}
