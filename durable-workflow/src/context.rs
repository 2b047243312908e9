//! Workflow context and core functions for authoring workflows.
//!
//! Workflow code never performs effects directly. Every activity call becomes
//! a `WorkflowCommand` submitted to the runtime through a `CommandSink`, and
//! the workflow resumes with whatever the runtime resolves it to.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use durable_core::{ActivityOptions, DataConverter, JsonDataConverter, WorkflowInfo};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::commands::{ScheduleActivityCommand, WorkflowCommand};
use crate::future::WorkflowError;

/// Trait for handling workflow commands (implemented by worker)
pub trait CommandSink: Send + Sync {
    fn submit(
        &self,
        command: WorkflowCommand,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>>;
}

/// No-op command sink for testing/initialization
struct NoopCommandSink;

impl CommandSink for NoopCommandSink {
    fn submit(
        &self,
        _command: WorkflowCommand,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>> {
        Box::pin(async { Err(WorkflowError::Generic("No command sink configured".into())) })
    }
}

/// Workflow context for executing workflow logic
pub struct WorkflowContext {
    workflow_info: WorkflowInfo,
    command_sink: Arc<dyn CommandSink>,
    sequence: AtomicU64,
}

impl WorkflowContext {
    pub fn new(workflow_info: WorkflowInfo) -> Self {
        Self::with_sink(workflow_info, Arc::new(NoopCommandSink))
    }

    pub fn with_sink(workflow_info: WorkflowInfo, sink: Arc<dyn CommandSink>) -> Self {
        Self {
            workflow_info,
            command_sink: sink,
            sequence: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!("{}", seq)
    }

    /// Get workflow information
    pub fn workflow_info(&self) -> &WorkflowInfo {
        &self.workflow_info
    }

    /// Execute an activity
    ///
    /// An empty `task_list` in the options schedules the activity on the
    /// workflow's own task list.
    pub async fn execute_activity(
        &self,
        activity_type: &str,
        args: Option<Vec<u8>>,
        mut options: ActivityOptions,
    ) -> Result<Vec<u8>, WorkflowError> {
        let activity_id = self.next_id();
        if options.task_list.is_empty() {
            options.task_list = self.workflow_info.task_list.clone();
        }

        debug!(
            workflow_id = %self.workflow_info.workflow_execution.workflow_id,
            activity_id = %activity_id,
            activity_type = %activity_type,
            "scheduling activity"
        );

        let command = WorkflowCommand::ScheduleActivity(ScheduleActivityCommand {
            activity_id,
            activity_type: activity_type.to_string(),
            args,
            options,
        });

        self.command_sink.submit(command).await
    }

    /// Execute an activity with JSON encoded input and output
    pub async fn execute_activity_typed<I, O>(
        &self,
        activity_type: &str,
        input: &I,
        options: ActivityOptions,
    ) -> Result<O, WorkflowError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let converter = JsonDataConverter;
        let args = converter.encode(input)?;
        let result = self
            .execute_activity(activity_type, Some(args), options)
            .await?;
        Ok(converter.decode(&result)?)
    }
}
