//! Workflow starter.
//!
//! `Starter` wraps a `Client` with a validated `StarterConfig` so callers
//! start one kind of workflow without rebuilding start options each time.

use std::sync::Arc;
use std::time::Duration;

use durable_core::{DataConverter, DurableError, DurableResult, JsonDataConverter, WorkflowExecution};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info, warn};

use crate::client::{Client, StartWorkflowOptions};

/// Configuration for a `Starter`
#[derive(Debug, Clone, Default)]
pub struct StarterConfig {
    pub task_list: String,
    pub workflow_type: String,
    /// Fixed workflow id, a fresh one is generated per start when unset
    pub workflow_id: Option<String>,
    pub execution_start_to_close_timeout: Option<Duration>,
    /// Cron schedule, requires a fixed workflow id
    pub cron_schedule: Option<String>,
}

impl StarterConfig {
    pub fn new(task_list: impl Into<String>, workflow_type: impl Into<String>) -> Self {
        Self {
            task_list: task_list.into(),
            workflow_type: workflow_type.into(),
            ..Default::default()
        }
    }

    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_cron_schedule(mut self, cron_schedule: impl Into<String>) -> Self {
        self.cron_schedule = Some(cron_schedule.into());
        self
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_start_to_close_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> DurableResult<()> {
        if self.task_list.trim().is_empty() {
            return Err(DurableError::InvalidArgument(
                "starter task list must not be empty".to_string(),
            ));
        }
        if self.workflow_type.trim().is_empty() {
            return Err(DurableError::InvalidArgument(
                "starter workflow type must not be empty".to_string(),
            ));
        }
        let has_id = self
            .workflow_id
            .as_deref()
            .map_or(false, |id| !id.trim().is_empty());
        if self.cron_schedule.is_some() && !has_id {
            return Err(DurableError::InvalidArgument(
                "a cron workflow needs a fixed workflow id".to_string(),
            ));
        }
        Ok(())
    }
}

/// Starts workflows of one type on one task list
#[derive(Clone)]
pub struct Starter {
    client: Arc<dyn Client>,
    config: StarterConfig,
}

impl Starter {
    pub fn new(client: Arc<dyn Client>, config: StarterConfig) -> DurableResult<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &StarterConfig {
        &self.config
    }

    /// Start the workflow and return once the service acknowledged it
    ///
    /// For a cron workflow the previous run under the same id is terminated
    /// first.
    pub async fn start<I>(&self, input: &I) -> DurableResult<WorkflowExecution>
    where
        I: Serialize + ?Sized,
    {
        let workflow_id = self.config.workflow_id.clone().unwrap_or_default();
        if self.config.cron_schedule.is_some() {
            match self
                .client
                .terminate_workflow(&workflow_id, None, "rescheduled")
                .await
            {
                Ok(()) => info!(workflow_id = %workflow_id, "terminated previous schedule"),
                Err(e) => warn!(workflow_id = %workflow_id, error = %e, "no previous schedule terminated"),
            }
        }

        let args = JsonDataConverter.encode(input)?;
        let options = StartWorkflowOptions {
            id: workflow_id,
            task_list: self.config.task_list.clone(),
            execution_start_to_close_timeout: self.config.execution_start_to_close_timeout,
            cron_schedule: self.config.cron_schedule.clone(),
        };
        let execution = self
            .client
            .start_workflow(options, &self.config.workflow_type, Some(&args))
            .await?;

        info!(
            workflow_id = %execution.workflow_id,
            run_id = %execution.run_id,
            workflow_type = %self.config.workflow_type,
            "started workflow"
        );
        Ok(execution)
    }

    /// Start the workflow and wait for its decoded result
    pub async fn start_and_wait<I, O>(&self, input: &I) -> DurableResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let execution = self.start(input).await?;
        let result = self.client.get_workflow_result(&execution).await;
        let decoded = result.and_then(|bytes| {
            let bytes = bytes.unwrap_or_default();
            JsonDataConverter.decode(&bytes).map_err(DurableError::from)
        });

        match &decoded {
            Ok(_) => info!(workflow_id = %execution.workflow_id, "workflow was successful"),
            Err(e) => error!(workflow_id = %execution.workflow_id, error = %e, "workflow failed"),
        }
        decoded
    }
}
