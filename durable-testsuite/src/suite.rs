//! Testing framework for workflows and activities.
//!
//! `TestWorkflowEnvironment` runs a registered workflow against activities
//! resolved in process, with no service or worker involved. Activities can
//! be real implementations or mocks that return a value, an error or a
//! timeout.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use durable_activity::{ActivityContext, ActivityInfo};
use durable_core::{
    TaskToken, TimeoutError, TimeoutType, WorkflowExecution, WorkflowInfo, WorkflowType,
};
use durable_worker::{Activity, ActivityError, Workflow};
use durable_workflow::{CommandSink, WorkflowCommand, WorkflowContext, WorkflowError};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};

type ActivityMock = Arc<dyn Fn(Option<Vec<u8>>) -> Result<Vec<u8>, WorkflowError> + Send + Sync>;

/// Test workflow environment for running workflow tests
pub struct TestWorkflowEnvironment {
    workflow_id: String,
    run_id: String,
    task_list: String,
    registered_workflows: HashMap<String, Box<dyn Workflow>>,
    registered_activities: HashMap<String, Box<dyn Activity>>,
    mocks: HashMap<String, ActivityMock>,
    executed_activities: Arc<Mutex<Vec<String>>>,
}

impl TestWorkflowEnvironment {
    /// Create a new test workflow environment
    pub fn new() -> Self {
        Self {
            workflow_id: format!("test-workflow-{}", uuid::Uuid::new_v4()),
            run_id: format!("test-run-{}", uuid::Uuid::new_v4()),
            task_list: "test-task-list".to_string(),
            registered_workflows: HashMap::new(),
            registered_activities: HashMap::new(),
            mocks: HashMap::new(),
            executed_activities: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a workflow for testing
    pub fn register_workflow(&mut self, name: &str, workflow: impl Workflow + 'static) {
        self.registered_workflows
            .insert(name.to_string(), Box::new(workflow));
    }

    /// Register a real activity implementation
    pub fn register_activity(&mut self, name: &str, activity: impl Activity + 'static) {
        self.registered_activities
            .insert(name.to_string(), Box::new(activity));
    }

    /// Mock an activity with a function of its raw input
    ///
    /// Mocks take precedence over registered activities.
    pub fn on_activity<F>(&mut self, name: &str, mock: F)
    where
        F: Fn(Option<Vec<u8>>) -> Result<Vec<u8>, WorkflowError> + Send + Sync + 'static,
    {
        self.mocks.insert(name.to_string(), Arc::new(mock));
    }

    /// Mock an activity to return `value`
    pub fn on_activity_return<T: Serialize>(&mut self, name: &str, value: &T) {
        let encoded = serde_json::to_vec(value)
            .map_err(|e| WorkflowError::Generic(format!("Mock serialization failed: {}", e)));
        self.on_activity(name, move |_| encoded.clone());
    }

    /// Mock an activity to fail
    pub fn on_activity_error(&mut self, name: &str, message: &str) {
        let message = message.to_string();
        self.on_activity(name, move |_| {
            Err(WorkflowError::ActivityFailed(message.clone()))
        });
    }

    /// Mock an activity to time out
    pub fn on_activity_timeout(&mut self, name: &str, timeout_type: TimeoutType) {
        let timeout = TimeoutError::new(timeout_type, name);
        self.on_activity(name, move |_| {
            Err(WorkflowError::ActivityTimeout(timeout.clone()))
        });
    }

    /// Execute a registered workflow by name with typed input
    pub async fn execute_workflow<I, O>(&self, name: &str, input: &I) -> Result<O, WorkflowError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let input_bytes = serde_json::to_vec(input)
            .map_err(|e| WorkflowError::Generic(format!("Input serialization failed: {}", e)))?;

        let workflow = self
            .registered_workflows
            .get(name)
            .ok_or_else(|| WorkflowError::Generic(format!("Workflow '{}' not registered", name)))?;

        let execution = WorkflowExecution::new(&self.workflow_id, &self.run_id);
        let sink = Arc::new(TestCommandSink {
            execution: execution.clone(),
            task_list: self.task_list.clone(),
            mocks: self.mocks.clone(),
            activities: self
                .registered_activities
                .iter()
                .map(|(name, activity)| (name.clone(), activity.clone()))
                .collect(),
            executed: self.executed_activities.clone(),
        });
        let info = WorkflowInfo {
            workflow_execution: execution,
            workflow_type: WorkflowType {
                name: name.to_string(),
            },
            task_list: self.task_list.clone(),
            attempt: 1,
        };
        let ctx = WorkflowContext::with_sink(info, sink);

        let result_bytes = workflow.execute(ctx, Some(input_bytes)).await?;

        serde_json::from_slice(&result_bytes)
            .map_err(|e| WorkflowError::Generic(format!("Output deserialization failed: {}", e)))
    }

    /// Get list of executed activities, in scheduling order (for assertions)
    pub fn get_executed_activities(&self) -> Vec<String> {
        self.executed_activities.lock().clone()
    }

    /// Check if an activity was executed
    pub fn was_activity_executed(&self, name: &str) -> bool {
        self.executed_activities.lock().iter().any(|a| a == name)
    }

    /// Number of times an activity was executed
    pub fn activity_execution_count(&self, name: &str) -> usize {
        self.executed_activities
            .lock()
            .iter()
            .filter(|a| a.as_str() == name)
            .count()
    }
}

impl Default for TestWorkflowEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

struct TestCommandSink {
    execution: WorkflowExecution,
    task_list: String,
    mocks: HashMap<String, ActivityMock>,
    activities: HashMap<String, Box<dyn Activity>>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl CommandSink for TestCommandSink {
    fn submit(
        &self,
        command: WorkflowCommand,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>> {
        let WorkflowCommand::ScheduleActivity(cmd) = command;
        self.executed.lock().push(cmd.activity_type.clone());

        if let Some(mock) = self.mocks.get(&cmd.activity_type) {
            let result = mock(cmd.args);
            return Box::pin(async move { result });
        }

        let activity = match self.activities.get(&cmd.activity_type) {
            Some(activity) => activity,
            None => {
                let message = format!("Activity '{}' not registered", cmd.activity_type);
                return Box::pin(async move { Err(WorkflowError::ActivityFailed(message)) });
            }
        };

        let task_list = if cmd.options.task_list.is_empty() {
            self.task_list.clone()
        } else {
            cmd.options.task_list.clone()
        };
        let ctx = ActivityContext::new(ActivityInfo {
            activity_id: cmd.activity_id.clone(),
            activity_type: cmd.activity_type.clone(),
            task_token: TaskToken::random(),
            workflow_execution: self.execution.clone(),
            task_list,
            attempt: 1,
            scheduled_time: chrono::Utc::now(),
            started_time: chrono::Utc::now(),
            deadline: None,
        });
        let activity_type = cmd.activity_type;
        let future = activity.execute(&ctx, cmd.args);

        Box::pin(async move {
            future.await.map_err(|e| match e {
                ActivityError::Timeout(timeout_type) => {
                    WorkflowError::ActivityTimeout(TimeoutError::new(timeout_type, &activity_type))
                }
                ActivityError::ResultPending => WorkflowError::ActivityFailed(format!(
                    "Activity '{}' completes asynchronously, mock it with on_activity",
                    activity_type
                )),
                other => WorkflowError::ActivityFailed(other.to_string()),
            })
        })
    }
}
