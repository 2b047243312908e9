//! In-process workflow service.
//!
//! `LocalWorkflowService` implements `WorkflowService` on top of in-memory
//! task lists. It provides what a worker and a client need to run workflows
//! inside one process: long-polled queues, activity timeouts, retries driven
//! by `RetryPolicy`, completion by task token and workflow result retrieval.
//! Nothing survives a restart.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use durable_core::{
    DurableError, DurableResult, FailureKind, ServerError, TaskToken, TimeoutError, TimeoutType,
    WorkflowExecution, WorkflowExecutionStatus, WorkflowFailure, WorkflowType,
};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch, Notify};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::service::*;

type ExecutionOutcome = Result<Option<Vec<u8>>, WorkflowFailure>;
type AttemptOutcome = Result<Option<Vec<u8>>, AttemptFailure>;

#[derive(Debug)]
struct AttemptFailure {
    reason: String,
    details: String,
}

/// FIFO queue with long-poll support
struct TaskQueue<T> {
    items: Mutex<VecDeque<T>>,
    notify: Notify,
}

impl<T: Send> TaskQueue<T> {
    fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    fn push(&self, item: T) {
        self.items.lock().push_back(item);
        self.notify.notify_one();
    }

    async fn poll(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(item) = self.items.lock().pop_front() {
                return Some(item);
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return self.items.lock().pop_front();
            }
        }
    }
}

struct ExecutionRecord {
    execution: WorkflowExecution,
    workflow_type: WorkflowType,
    task_list: String,
    status: WorkflowExecutionStatus,
    start_time: DateTime<Utc>,
    close_time: Option<DateTime<Utc>>,
    outcome: watch::Sender<Option<ExecutionOutcome>>,
}

struct PendingAttempt {
    workflow_execution: WorkflowExecution,
    activity_id: String,
    activity_type: String,
    attempt: u32,
    started: Option<oneshot::Sender<()>>,
    result: oneshot::Sender<AttemptOutcome>,
}

#[derive(Default)]
struct Inner {
    workflow_queues: DashMap<String, Arc<TaskQueue<WorkflowTask>>>,
    activity_queues: DashMap<String, Arc<TaskQueue<ActivityTask>>>,
    executions: Mutex<HashMap<String, Vec<ExecutionRecord>>>,
    pending: DashMap<TaskToken, PendingAttempt>,
}

impl Inner {
    fn workflow_queue(&self, task_list: &str) -> Arc<TaskQueue<WorkflowTask>> {
        self.workflow_queues
            .entry(task_list.to_string())
            .or_insert_with(|| Arc::new(TaskQueue::new()))
            .value()
            .clone()
    }

    fn activity_queue(&self, task_list: &str) -> Arc<TaskQueue<ActivityTask>> {
        self.activity_queues
            .entry(task_list.to_string())
            .or_insert_with(|| Arc::new(TaskQueue::new()))
            .value()
            .clone()
    }
}

fn find_record<'a>(
    executions: &'a mut HashMap<String, Vec<ExecutionRecord>>,
    execution: &WorkflowExecution,
) -> Option<&'a mut ExecutionRecord> {
    let runs = executions.get_mut(&execution.workflow_id)?;
    if execution.run_id.is_empty() {
        runs.last_mut()
    } else {
        runs.iter_mut()
            .find(|r| r.execution.run_id == execution.run_id)
    }
}

fn entity_not_exists(message: impl Into<String>) -> DurableError {
    DurableError::Server(ServerError::EntityNotExists {
        message: message.into(),
    })
}

/// Deadline for one phase of an attempt, capped by the schedule-to-close deadline
fn phase_deadline(
    timeout: Duration,
    timeout_type: TimeoutType,
    overall: Option<Instant>,
) -> (Option<Instant>, TimeoutType) {
    let own = (!timeout.is_zero()).then(|| Instant::now() + timeout);
    match (own, overall) {
        (Some(own), Some(overall)) if overall < own => {
            (Some(overall), TimeoutType::ScheduleToClose)
        }
        (Some(own), _) => (Some(own), timeout_type),
        (None, Some(overall)) => (Some(overall), TimeoutType::ScheduleToClose),
        (None, None) => (None, timeout_type),
    }
}

async fn wait_until<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// In-memory workflow service for tests and single-process deployments
#[derive(Clone, Default)]
pub struct LocalWorkflowService {
    inner: Arc<Inner>,
}

impl LocalWorkflowService {
    pub fn new() -> Self {
        Self::default()
    }

    fn close_execution(
        &self,
        execution: &WorkflowExecution,
        outcome: ExecutionOutcome,
    ) -> DurableResult<WorkflowExecution> {
        let closed = {
            let mut executions = self.inner.executions.lock();
            let record = find_record(&mut executions, execution)
                .ok_or_else(|| entity_not_exists(format!("workflow {} not found", execution)))?;
            if record.status != WorkflowExecutionStatus::Running {
                return Err(entity_not_exists(format!(
                    "workflow {} is already closed",
                    record.execution
                )));
            }
            record.status = if outcome.is_ok() {
                WorkflowExecutionStatus::Completed
            } else {
                WorkflowExecutionStatus::Failed
            };
            record.close_time = Some(Utc::now());
            record.outcome.send_replace(Some(outcome));
            record.execution.clone()
        };

        // Attempts of a closed execution can no longer be completed
        self.inner
            .pending
            .retain(|_, attempt| attempt.workflow_execution != closed);
        Ok(closed)
    }

    fn is_running(&self, execution: &WorkflowExecution) -> bool {
        let mut executions = self.inner.executions.lock();
        find_record(&mut executions, execution)
            .map(|r| r.status == WorkflowExecutionStatus::Running)
            .unwrap_or(false)
    }

    fn activity_timed_out(
        &self,
        request: &ScheduleActivityTaskRequest,
        timeout_type: TimeoutType,
    ) -> DurableError {
        warn!(
            workflow_id = %request.workflow_execution.workflow_id,
            activity_id = %request.activity_id,
            activity_type = %request.activity_type,
            timeout_type = %timeout_type,
            "activity timed out"
        );
        DurableError::Timeout(TimeoutError::new(timeout_type, &request.activity_type))
    }

    /// Run one attempt: enqueue it, wait for pickup, then wait for the result
    ///
    /// The outer error is a timeout or an abandoned attempt, the inner one is
    /// the failure reported by the worker.
    async fn run_attempt(
        &self,
        request: &ScheduleActivityTaskRequest,
        attempt: u32,
        overall: Option<Instant>,
    ) -> DurableResult<AttemptOutcome> {
        let options = &request.options;
        let token = TaskToken::random();
        let (started_tx, started_rx) = oneshot::channel();
        let (result_tx, mut result_rx) = oneshot::channel();

        self.inner.pending.insert(
            token.clone(),
            PendingAttempt {
                workflow_execution: request.workflow_execution.clone(),
                activity_id: request.activity_id.clone(),
                activity_type: request.activity_type.clone(),
                attempt,
                started: Some(started_tx),
                result: result_tx,
            },
        );

        let scheduled_time = Utc::now();
        self.inner
            .activity_queue(&options.task_list)
            .push(ActivityTask {
                task_token: token.clone(),
                workflow_execution: request.workflow_execution.clone(),
                activity_id: request.activity_id.clone(),
                activity_type: request.activity_type.clone(),
                task_list: options.task_list.clone(),
                input: request.input.clone(),
                attempt,
                scheduled_time,
                started_time: scheduled_time,
                start_to_close_timeout: options.start_to_close_timeout,
            });

        let (deadline, timeout_type) = phase_deadline(
            options.schedule_to_start_timeout,
            TimeoutType::ScheduleToStart,
            overall,
        );
        match wait_until(deadline, started_rx).await {
            Some(Ok(())) => {}
            Some(Err(_)) => {
                return Err(DurableError::Other(format!(
                    "activity {} abandoned before start",
                    request.activity_id
                )))
            }
            None => {
                self.inner.pending.remove(&token);
                return Err(self.activity_timed_out(request, timeout_type));
            }
        }

        let (deadline, timeout_type) = phase_deadline(
            options.start_to_close_timeout,
            TimeoutType::StartToClose,
            overall,
        );
        match wait_until(deadline, &mut result_rx).await {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(_)) => Err(DurableError::Other(format!(
                "activity {} abandoned",
                request.activity_id
            ))),
            None => {
                if self.inner.pending.remove(&token).is_none() {
                    // Resolved at the same instant the deadline fired
                    if let Ok(outcome) = result_rx.try_recv() {
                        return Ok(outcome);
                    }
                }
                Err(self.activity_timed_out(request, timeout_type))
            }
        }
    }
}

#[async_trait]
impl WorkflowService for LocalWorkflowService {
    async fn start_workflow_execution(
        &self,
        request: StartWorkflowExecutionRequest,
    ) -> DurableResult<StartWorkflowExecutionResponse> {
        if request.workflow_id.is_empty() {
            return Err(DurableError::InvalidArgument(
                "workflow id is required".to_string(),
            ));
        }
        if request.task_list.is_empty() {
            return Err(DurableError::InvalidArgument(
                "task list is required".to_string(),
            ));
        }

        let execution = WorkflowExecution::new(&request.workflow_id, Uuid::new_v4().to_string());
        {
            let mut executions = self.inner.executions.lock();
            let runs = executions.entry(request.workflow_id.clone()).or_default();
            if runs
                .iter()
                .any(|r| r.status == WorkflowExecutionStatus::Running)
            {
                return Err(ServerError::WorkflowExecutionAlreadyStarted {
                    message: format!("workflow {} is already running", request.workflow_id),
                }
                .into());
            }
            let (outcome, _) = watch::channel(None);
            runs.push(ExecutionRecord {
                execution: execution.clone(),
                workflow_type: request.workflow_type.clone(),
                task_list: request.task_list.clone(),
                status: WorkflowExecutionStatus::Running,
                start_time: Utc::now(),
                close_time: None,
                outcome,
            });
        }

        if let Some(cron) = &request.cron_schedule {
            warn!(
                workflow_id = %execution.workflow_id,
                cron_schedule = %cron,
                "cron schedules are not evaluated in process, running once"
            );
        }

        if let Some(timeout) = request
            .execution_start_to_close_timeout
            .filter(|t| !t.is_zero())
        {
            let service = self.clone();
            let execution = execution.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                let failure = WorkflowFailure {
                    kind: FailureKind::Timeout,
                    message: format!("workflow execution exceeded {:?}", timeout),
                    timeout_type: Some(TimeoutType::StartToClose),
                };
                if service.close_execution(&execution, Err(failure)).is_ok() {
                    warn!(workflow_id = %execution.workflow_id, "workflow execution timed out");
                }
            });
        }

        self.inner
            .workflow_queue(&request.task_list)
            .push(WorkflowTask {
                workflow_execution: execution.clone(),
                workflow_type: request.workflow_type.clone(),
                task_list: request.task_list.clone(),
                input: request.input,
                attempt: 1,
            });

        info!(
            workflow_id = %execution.workflow_id,
            run_id = %execution.run_id,
            workflow_type = %request.workflow_type.name,
            task_list = %request.task_list,
            "workflow execution started"
        );

        Ok(StartWorkflowExecutionResponse {
            run_id: execution.run_id,
        })
    }

    async fn terminate_workflow_execution(
        &self,
        request: TerminateWorkflowExecutionRequest,
    ) -> DurableResult<()> {
        let execution = WorkflowExecution::new(
            request.workflow_id,
            request.run_id.unwrap_or_default(),
        );
        let failure = WorkflowFailure::new(FailureKind::Terminated, request.reason.clone());
        let closed = self.close_execution(&execution, Err(failure))?;
        info!(
            workflow_id = %closed.workflow_id,
            run_id = %closed.run_id,
            reason = %request.reason,
            "workflow execution terminated"
        );
        Ok(())
    }

    async fn poll_for_workflow_task(
        &self,
        request: PollForWorkflowTaskRequest,
    ) -> DurableResult<Option<WorkflowTask>> {
        let task = self
            .inner
            .workflow_queue(&request.task_list)
            .poll(request.poll_timeout)
            .await;
        Ok(task.filter(|t| self.is_running(&t.workflow_execution)))
    }

    async fn respond_workflow_task_completed(
        &self,
        request: RespondWorkflowTaskCompletedRequest,
    ) -> DurableResult<()> {
        let closed = self.close_execution(&request.workflow_execution, Ok(request.result))?;
        info!(
            workflow_id = %closed.workflow_id,
            run_id = %closed.run_id,
            "workflow execution completed"
        );
        Ok(())
    }

    async fn respond_workflow_task_failed(
        &self,
        request: RespondWorkflowTaskFailedRequest,
    ) -> DurableResult<()> {
        let message = request.failure.message.clone();
        let closed = self.close_execution(&request.workflow_execution, Err(request.failure))?;
        warn!(
            workflow_id = %closed.workflow_id,
            run_id = %closed.run_id,
            error = %message,
            "workflow execution failed"
        );
        Ok(())
    }

    async fn schedule_activity_task(
        &self,
        request: ScheduleActivityTaskRequest,
    ) -> DurableResult<Vec<u8>> {
        if request.options.task_list.is_empty() {
            return Err(DurableError::InvalidArgument(
                "activity task list is required".to_string(),
            ));
        }
        if !self.is_running(&request.workflow_execution) {
            return Err(entity_not_exists(format!(
                "workflow {} is not running",
                request.workflow_execution
            )));
        }

        let overall = Some(request.options.schedule_to_close_timeout)
            .filter(|t| !t.is_zero())
            .map(|t| Instant::now() + t);
        let mut attempt = 1;

        loop {
            let failure = match self.run_attempt(&request, attempt, overall).await? {
                Ok(result) => return Ok(result.unwrap_or_default()),
                Err(failure) => failure,
            };

            let retry_policy = request
                .options
                .retry_policy
                .as_ref()
                .filter(|policy| policy.should_retry(attempt, &failure.reason));
            let delay = match retry_policy {
                Some(policy) => policy.backoff(attempt),
                None => {
                    return Err(DurableError::ActivityFailed {
                        reason: failure.reason,
                        details: failure.details,
                    })
                }
            };
            if overall.map_or(false, |deadline| Instant::now() + delay >= deadline) {
                return Err(DurableError::ActivityFailed {
                    reason: failure.reason,
                    details: failure.details,
                });
            }

            warn!(
                workflow_id = %request.workflow_execution.workflow_id,
                activity_type = %request.activity_type,
                attempt,
                reason = %failure.reason,
                details = %failure.details,
                retry_in_ms = delay.as_millis() as u64,
                "activity attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn poll_for_activity_task(
        &self,
        request: PollForActivityTaskRequest,
    ) -> DurableResult<Option<ActivityTask>> {
        let queue = self.inner.activity_queue(&request.task_list);
        let deadline = Instant::now() + request.poll_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let mut task = match queue.poll(remaining).await {
                Some(task) => task,
                None => return Ok(None),
            };

            let started = self
                .inner
                .pending
                .get_mut(&task.task_token)
                .and_then(|mut attempt| attempt.started.take())
                .map(|started| started.send(()).is_ok())
                .unwrap_or(false);
            if !started {
                debug!(activity_id = %task.activity_id, "skipping revoked activity task");
                continue;
            }

            task.started_time = Utc::now();
            debug!(
                workflow_id = %task.workflow_execution.workflow_id,
                activity_id = %task.activity_id,
                activity_type = %task.activity_type,
                identity = %request.identity,
                "activity task started"
            );
            return Ok(Some(task));
        }
    }

    async fn respond_activity_task_completed(
        &self,
        request: RespondActivityTaskCompletedRequest,
    ) -> DurableResult<()> {
        let (_, attempt) = self
            .inner
            .pending
            .remove(&request.task_token)
            .ok_or_else(|| entity_not_exists("activity task not found or already completed"))?;
        attempt
            .result
            .send(Ok(request.result))
            .map_err(|_| entity_not_exists("activity task not found or already completed"))?;

        debug!(
            workflow_id = %attempt.workflow_execution.workflow_id,
            activity_id = %attempt.activity_id,
            activity_type = %attempt.activity_type,
            identity = %request.identity,
            "activity task completed"
        );
        Ok(())
    }

    async fn respond_activity_task_failed(
        &self,
        request: RespondActivityTaskFailedRequest,
    ) -> DurableResult<()> {
        let (_, attempt) = self
            .inner
            .pending
            .remove(&request.task_token)
            .ok_or_else(|| entity_not_exists("activity task not found or already completed"))?;
        attempt
            .result
            .send(Err(AttemptFailure {
                reason: request.reason,
                details: request.details,
            }))
            .map_err(|_| entity_not_exists("activity task not found or already completed"))?;

        debug!(
            workflow_id = %attempt.workflow_execution.workflow_id,
            activity_id = %attempt.activity_id,
            activity_type = %attempt.activity_type,
            attempt = attempt.attempt,
            "activity task failed"
        );
        Ok(())
    }

    async fn get_workflow_execution_result(
        &self,
        execution: WorkflowExecution,
    ) -> DurableResult<Option<Vec<u8>>> {
        let mut outcome = {
            let mut executions = self.inner.executions.lock();
            find_record(&mut executions, &execution)
                .ok_or_else(|| entity_not_exists(format!("workflow {} not found", execution)))?
                .outcome
                .subscribe()
        };

        loop {
            let current = outcome.borrow_and_update().clone();
            if let Some(result) = current {
                return result.map_err(DurableError::WorkflowFailed);
            }
            outcome
                .changed()
                .await
                .map_err(|_| DurableError::Other("workflow execution record dropped".into()))?;
        }
    }

    async fn describe_workflow_execution(
        &self,
        execution: WorkflowExecution,
    ) -> DurableResult<DescribeWorkflowExecutionResponse> {
        let mut response = {
            let mut executions = self.inner.executions.lock();
            let record = find_record(&mut executions, &execution)
                .ok_or_else(|| entity_not_exists(format!("workflow {} not found", execution)))?;
            DescribeWorkflowExecutionResponse {
                workflow_execution: record.execution.clone(),
                workflow_type: record.workflow_type.clone(),
                task_list: record.task_list.clone(),
                status: record.status,
                start_time: record.start_time,
                close_time: record.close_time,
                pending_activities: Vec::new(),
            }
        };

        response.pending_activities = self
            .inner
            .pending
            .iter()
            .filter(|entry| entry.workflow_execution == response.workflow_execution)
            .map(|entry| PendingActivityInfo {
                activity_id: entry.activity_id.clone(),
                activity_type: entry.activity_type.clone(),
                attempt: entry.attempt,
            })
            .collect();
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use durable_core::{
        is_activity_failed_error, is_entity_not_exists_error, is_timeout_error,
        is_workflow_execution_already_started_error, ActivityOptions, RetryPolicy,
    };

    const TASK_LIST: &str = "expenseGroup";

    fn start_request(workflow_id: &str) -> StartWorkflowExecutionRequest {
        StartWorkflowExecutionRequest {
            workflow_id: workflow_id.to_string(),
            workflow_type: WorkflowType {
                name: "expense_workflow".to_string(),
            },
            task_list: TASK_LIST.to_string(),
            input: None,
            execution_start_to_close_timeout: None,
            cron_schedule: None,
            identity: "test".to_string(),
            request_id: Uuid::new_v4().to_string(),
        }
    }

    fn activity_request(
        execution: &WorkflowExecution,
        options: ActivityOptions,
    ) -> ScheduleActivityTaskRequest {
        ScheduleActivityTaskRequest {
            workflow_execution: execution.clone(),
            activity_id: "0".to_string(),
            activity_type: "wait_for_decision".to_string(),
            input: None,
            options: ActivityOptions {
                task_list: TASK_LIST.to_string(),
                ..options
            },
        }
    }

    fn activity_poll() -> PollForActivityTaskRequest {
        PollForActivityTaskRequest {
            task_list: TASK_LIST.to_string(),
            identity: "test-worker".to_string(),
            poll_timeout: Duration::from_secs(1),
        }
    }

    async fn started(service: &LocalWorkflowService, workflow_id: &str) -> WorkflowExecution {
        let response = service
            .start_workflow_execution(start_request(workflow_id))
            .await
            .unwrap();
        WorkflowExecution::new(workflow_id, response.run_id)
    }

    #[tokio::test]
    async fn test_duplicate_running_workflow_id_is_rejected() {
        let service = LocalWorkflowService::new();
        started(&service, "expense_1").await;

        let err = service
            .start_workflow_execution(start_request("expense_1"))
            .await
            .unwrap_err();
        assert!(is_workflow_execution_already_started_error(&err));
    }

    #[tokio::test]
    async fn test_workflow_result_after_completion() {
        let service = LocalWorkflowService::new();
        let execution = started(&service, "expense_1").await;

        let task = service
            .poll_for_workflow_task(PollForWorkflowTaskRequest {
                task_list: TASK_LIST.to_string(),
                identity: "test-worker".to_string(),
                poll_timeout: Duration::from_secs(1),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task.workflow_execution, execution);

        let waiter = {
            let service = service.clone();
            let execution = WorkflowExecution::new("expense_1", "");
            tokio::spawn(async move { service.get_workflow_execution_result(execution).await })
        };
        service
            .respond_workflow_task_completed(RespondWorkflowTaskCompletedRequest {
                workflow_execution: execution.clone(),
                result: Some(b"\"COMPLETED\"".to_vec()),
                identity: "test-worker".to_string(),
            })
            .await
            .unwrap();

        let result = waiter.await.unwrap().unwrap();
        assert_eq!(result, Some(b"\"COMPLETED\"".to_vec()));

        let description = service.describe_workflow_execution(execution).await.unwrap();
        assert_eq!(description.status, WorkflowExecutionStatus::Completed);
        assert!(description.close_time.is_some());
    }

    #[tokio::test]
    async fn test_token_completes_at_most_once() {
        let service = LocalWorkflowService::new();
        let execution = started(&service, "expense_1").await;

        let scheduled = {
            let service = service.clone();
            let request = activity_request(&execution, ActivityOptions::default());
            tokio::spawn(async move { service.schedule_activity_task(request).await })
        };

        let task = service
            .poll_for_activity_task(activity_poll())
            .await
            .unwrap()
            .unwrap();
        let complete = |result: &'static [u8]| RespondActivityTaskCompletedRequest {
            task_token: task.task_token.clone(),
            result: Some(result.to_vec()),
            identity: "gateway".to_string(),
        };

        service
            .respond_activity_task_completed(complete(b"\"APPROVED\""))
            .await
            .unwrap();
        let err = service
            .respond_activity_task_completed(complete(b"\"REJECTED\""))
            .await
            .unwrap_err();

        assert!(is_entity_not_exists_error(&err));
        assert_eq!(scheduled.await.unwrap().unwrap(), b"\"APPROVED\"".to_vec());
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let service = LocalWorkflowService::new();
        let err = service
            .respond_activity_task_completed(RespondActivityTaskCompletedRequest {
                task_token: TaskToken::random(),
                result: None,
                identity: "gateway".to_string(),
            })
            .await
            .unwrap_err();
        assert!(is_entity_not_exists_error(&err));
    }

    #[tokio::test]
    async fn test_schedule_to_start_timeout_without_pollers() {
        let service = LocalWorkflowService::new();
        let execution = started(&service, "expense_1").await;

        let err = service
            .schedule_activity_task(activity_request(
                &execution,
                ActivityOptions {
                    schedule_to_start_timeout: Duration::from_millis(50),
                    ..Default::default()
                },
            ))
            .await
            .unwrap_err();

        match err {
            DurableError::Timeout(timeout) => {
                assert_eq!(timeout.timeout_type(), TimeoutType::ScheduleToStart)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_start_to_close_timeout_revokes_token() {
        let service = LocalWorkflowService::new();
        let execution = started(&service, "expense_1").await;

        let scheduled = {
            let service = service.clone();
            let request = activity_request(
                &execution,
                ActivityOptions {
                    start_to_close_timeout: Duration::from_millis(100),
                    ..Default::default()
                },
            );
            tokio::spawn(async move { service.schedule_activity_task(request).await })
        };
        let task = service
            .poll_for_activity_task(activity_poll())
            .await
            .unwrap()
            .unwrap();

        let err = scheduled.await.unwrap().unwrap_err();
        assert!(is_timeout_error(&err));

        let late = service
            .respond_activity_task_completed(RespondActivityTaskCompletedRequest {
                task_token: task.task_token,
                result: Some(b"\"APPROVED\"".to_vec()),
                identity: "gateway".to_string(),
            })
            .await
            .unwrap_err();
        assert!(is_entity_not_exists_error(&late));
    }

    #[tokio::test]
    async fn test_failed_attempt_is_retried_with_new_token() {
        let service = LocalWorkflowService::new();
        let execution = started(&service, "expense_1").await;

        let scheduled = {
            let service = service.clone();
            let request = activity_request(
                &execution,
                ActivityOptions {
                    retry_policy: Some(RetryPolicy {
                        initial_interval: Duration::from_millis(10),
                        maximum_attempts: 2,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            );
            tokio::spawn(async move { service.schedule_activity_task(request).await })
        };

        let mut tokens = Vec::new();
        for attempt in 1..=2u32 {
            let task = service
                .poll_for_activity_task(activity_poll())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(task.attempt, attempt);
            tokens.push(task.task_token.clone());
            service
                .respond_activity_task_failed(RespondActivityTaskFailedRequest {
                    task_token: task.task_token,
                    reason: "Retryable".to_string(),
                    details: "gateway unreachable".to_string(),
                    identity: "test-worker".to_string(),
                })
                .await
                .unwrap();
        }

        let err = scheduled.await.unwrap().unwrap_err();
        assert!(is_activity_failed_error(&err));
        assert_ne!(tokens[0], tokens[1]);
    }

    #[tokio::test]
    async fn test_terminate_fails_result_and_revokes_attempts() {
        let service = LocalWorkflowService::new();
        let execution = started(&service, "expense_1").await;

        let scheduled = {
            let service = service.clone();
            let request = activity_request(&execution, ActivityOptions::default());
            tokio::spawn(async move { service.schedule_activity_task(request).await })
        };
        service
            .poll_for_activity_task(activity_poll())
            .await
            .unwrap()
            .unwrap();

        service
            .terminate_workflow_execution(TerminateWorkflowExecutionRequest {
                workflow_id: "expense_1".to_string(),
                run_id: None,
                reason: "rescheduled".to_string(),
                identity: "test".to_string(),
            })
            .await
            .unwrap();

        assert!(scheduled.await.unwrap().is_err());
        let err = service
            .get_workflow_execution_result(execution)
            .await
            .unwrap_err();
        match err {
            DurableError::WorkflowFailed(failure) => {
                assert_eq!(failure.kind, FailureKind::Terminated)
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The id is free again once the previous run closed
        started(&service, "expense_1").await;
    }
}
