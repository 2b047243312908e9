//! Worker implementation for hosting workflows and activities.
//!
//! A worker polls one task list and executes the workflows and activities
//! registered with it. The set of registrations is fixed by `WorkerConfig`
//! at construction.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use durable_client::WorkflowService;
use durable_core::WorkerIdentity;
use parking_lot::Mutex;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::handlers::{ActivityTaskHandler, WorkflowTaskHandler};
use crate::pollers::{run_poller, ActivityTaskPoller, WorkflowTaskPoller};
use crate::registry::{Activity, Registry, Workflow, WorkflowRegistry};

/// Worker trait for hosting workflows and activities
#[async_trait]
pub trait Worker: Send + Sync {
    /// Start the worker in non-blocking mode
    ///
    /// Must be called from within a Tokio runtime.
    fn start(&self) -> Result<(), WorkerError>;

    /// Start the worker and block until `stop` is called or Ctrl+C is received
    async fn run(&self) -> Result<(), WorkerError>;

    /// Stop the worker
    fn stop(&self);
}

/// Worker errors
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker already started")]
    AlreadyStarted,
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Worker is shutting down")]
    ShuttingDown,
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(String),
}

/// Worker options for configuration
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Maximum concurrent activity executions
    pub max_concurrent_activity_execution_size: usize,
    /// Maximum concurrent workflow executions
    pub max_concurrent_workflow_execution_size: usize,
    /// Number of concurrent workflow task pollers
    pub max_concurrent_workflow_task_pollers: usize,
    /// Number of concurrent activity task pollers
    pub max_concurrent_activity_task_pollers: usize,
    /// Long-poll timeout for a single poll request
    pub poll_timeout: Duration,
    /// How long `run` waits for pollers to wind down after stop
    pub worker_stop_timeout: Duration,
    /// Identity
    pub identity: String,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            max_concurrent_activity_execution_size: 1000,
            max_concurrent_workflow_execution_size: 1000,
            max_concurrent_workflow_task_pollers: 2,
            max_concurrent_activity_task_pollers: 2,
            poll_timeout: Duration::from_secs(5),
            worker_stop_timeout: Duration::from_secs(10),
            identity: WorkerIdentity::default().name,
        }
    }
}

impl WorkerOptions {
    pub fn validate(&self) -> Result<(), WorkerError> {
        let sizes = [
            (
                "max_concurrent_activity_execution_size",
                self.max_concurrent_activity_execution_size,
            ),
            (
                "max_concurrent_workflow_execution_size",
                self.max_concurrent_workflow_execution_size,
            ),
            (
                "max_concurrent_workflow_task_pollers",
                self.max_concurrent_workflow_task_pollers,
            ),
            (
                "max_concurrent_activity_task_pollers",
                self.max_concurrent_activity_task_pollers,
            ),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(WorkerError::InvalidConfiguration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        if self.poll_timeout.is_zero() {
            return Err(WorkerError::InvalidConfiguration(
                "poll_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a worker hosts, validated before the worker is built
#[derive(Clone, Default)]
pub struct WorkerConfig {
    pub task_list: String,
    pub workflows: Vec<(String, Box<dyn Workflow>)>,
    pub activities: Vec<(String, Box<dyn Activity>)>,
    pub options: WorkerOptions,
}

impl WorkerConfig {
    pub fn new(task_list: impl Into<String>) -> Self {
        Self {
            task_list: task_list.into(),
            ..Default::default()
        }
    }

    pub fn with_workflow(mut self, name: impl Into<String>, workflow: impl Workflow + 'static) -> Self {
        self.workflows.push((name.into(), Box::new(workflow)));
        self
    }

    pub fn with_activity(mut self, name: impl Into<String>, activity: impl Activity + 'static) -> Self {
        self.activities.push((name.into(), Box::new(activity)));
        self
    }

    pub fn with_options(mut self, options: WorkerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.task_list.trim().is_empty() {
            return Err(WorkerError::InvalidConfiguration(
                "task list must not be empty".to_string(),
            ));
        }
        if self.workflows.is_empty() && self.activities.is_empty() {
            return Err(WorkerError::InvalidConfiguration(
                "at least one workflow or activity must be registered".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for name in self.workflows.iter().map(|(n, _)| n) {
            if name.trim().is_empty() || !seen.insert(name.as_str()) {
                return Err(WorkerError::InvalidConfiguration(format!(
                    "invalid or duplicate workflow name '{}'",
                    name
                )));
            }
        }
        let mut seen = HashSet::new();
        for name in self.activities.iter().map(|(n, _)| n) {
            if name.trim().is_empty() || !seen.insert(name.as_str()) {
                return Err(WorkerError::InvalidConfiguration(format!(
                    "invalid or duplicate activity name '{}'",
                    name
                )));
            }
        }

        self.options.validate()
    }
}

impl std::fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("task_list", &self.task_list)
            .field(
                "workflows",
                &self.workflows.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field(
                "activities",
                &self.activities.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field("options", &self.options)
            .finish()
    }
}

/// Worker implementation
pub struct DurableWorker {
    service: Arc<dyn WorkflowService>,
    task_list: String,
    options: WorkerOptions,
    registry: Arc<WorkflowRegistry>,
    started: AtomicBool,
    stop_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl DurableWorker {
    pub fn new(service: Arc<dyn WorkflowService>, config: WorkerConfig) -> Result<Self, WorkerError> {
        config.validate()?;

        let registry = WorkflowRegistry::new();
        for (name, workflow) in config.workflows {
            registry.register_workflow(&name, workflow);
        }
        for (name, activity) in config.activities {
            registry.register_activity(&name, activity);
        }
        let (stop_tx, _) = watch::channel(false);

        Ok(Self {
            service,
            task_list: config.task_list,
            options: config.options,
            registry: Arc::new(registry),
            started: AtomicBool::new(false),
            stop_tx,
            handles: Mutex::new(Vec::new()),
        })
    }

    pub fn task_list(&self) -> &str {
        &self.task_list
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    fn spawn_pollers(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        let registry: Arc<dyn Registry> = self.registry.clone();

        if !self.registry.get_registered_workflows().is_empty() {
            let handler = Arc::new(WorkflowTaskHandler::new(
                self.service.clone(),
                registry.clone(),
                self.options.identity.clone(),
            ));
            let poller = Arc::new(WorkflowTaskPoller::new(
                self.service.clone(),
                &self.task_list,
                &self.options.identity,
                self.options.poll_timeout,
                handler,
            ));
            let slots = Arc::new(Semaphore::new(
                self.options.max_concurrent_workflow_execution_size,
            ));
            for _ in 0..self.options.max_concurrent_workflow_task_pollers {
                handles.push(tokio::spawn(run_poller(
                    poller.clone(),
                    slots.clone(),
                    self.stop_tx.subscribe(),
                )));
            }
        }

        if !self.registry.get_registered_activities().is_empty() {
            let handler = Arc::new(ActivityTaskHandler::new(
                self.service.clone(),
                registry,
                self.options.identity.clone(),
                self.stop_tx.subscribe(),
            ));
            let poller = Arc::new(ActivityTaskPoller::new(
                self.service.clone(),
                &self.task_list,
                &self.options.identity,
                self.options.poll_timeout,
                handler,
            ));
            let slots = Arc::new(Semaphore::new(
                self.options.max_concurrent_activity_execution_size,
            ));
            for _ in 0..self.options.max_concurrent_activity_task_pollers {
                handles.push(tokio::spawn(run_poller(
                    poller.clone(),
                    slots.clone(),
                    self.stop_tx.subscribe(),
                )));
            }
        }

        handles
    }
}

#[async_trait]
impl Worker for DurableWorker {
    fn start(&self) -> Result<(), WorkerError> {
        if self.is_stopped() {
            return Err(WorkerError::ShuttingDown);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(WorkerError::AlreadyStarted);
        }

        let handles = self.spawn_pollers();
        info!(
            task_list = %self.task_list,
            identity = %self.options.identity,
            workflows = self.registry.get_registered_workflows().len(),
            activities = self.registry.get_registered_activities().len(),
            "worker started"
        );
        self.handles.lock().extend(handles);
        Ok(())
    }

    async fn run(&self) -> Result<(), WorkerError> {
        self.start()?;

        let mut stop_rx = self.stop_tx.subscribe();
        let signal = tokio::select! {
            result = tokio::signal::ctrl_c() => Some(result),
            _ = stop_rx.wait_for(|stopped| *stopped) => None,
        };
        match signal {
            Some(Ok(())) => info!(task_list = %self.task_list, "received Ctrl+C, stopping worker"),
            Some(Err(e)) => {
                self.stop();
                return Err(WorkerError::Signal(e.to_string()));
            }
            None => {}
        }
        self.stop();

        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        let joined = tokio::time::timeout(
            self.options.worker_stop_timeout,
            futures::future::join_all(handles),
        )
        .await;
        if joined.is_err() {
            warn!(task_list = %self.task_list, "pollers did not stop in time");
        }
        info!(task_list = %self.task_list, "worker stopped");
        Ok(())
    }

    fn stop(&self) {
        if !self.stop_tx.send_replace(true) {
            info!(task_list = %self.task_list, "stopping worker");
        }
    }
}
