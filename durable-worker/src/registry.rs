//! Workflow and activity registry.
//!
//! This module provides the registry for registering workflows and activities.

use dashmap::DashMap;
use dyn_clone::DynClone;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use durable_activity::ActivityContext;
pub use durable_activity::ActivityError;
use durable_workflow::WorkflowContext;
pub use durable_workflow::WorkflowError;

/// Workflow trait
pub trait Workflow: Send + Sync + DynClone {
    fn execute(
        &self,
        ctx: WorkflowContext,
        input: Option<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>>;
}

dyn_clone::clone_trait_object!(Workflow);

/// Activity trait
pub trait Activity: Send + Sync + DynClone {
    fn execute(
        &self,
        ctx: &ActivityContext,
        input: Option<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ActivityError>> + Send>>;
}

dyn_clone::clone_trait_object!(Activity);

/// Registry trait
pub trait Registry: Send + Sync {
    /// Register a workflow
    fn register_workflow(&self, name: &str, workflow: Box<dyn Workflow>);

    /// Get registered workflow info
    fn get_registered_workflows(&self) -> Vec<RegistryInfo>;

    /// Register an activity
    fn register_activity(&self, name: &str, activity: Box<dyn Activity>);

    /// Get registered activity info
    fn get_registered_activities(&self) -> Vec<RegistryInfo>;

    /// Get workflow by name
    fn get_workflow(&self, name: &str) -> Option<Box<dyn Workflow>>;

    /// Get activity by name
    fn get_activity(&self, name: &str) -> Option<Box<dyn Activity>>;
}

/// Registry information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryInfo {
    pub name: String,
    pub type_name: String,
}

/// Workflow registry implementation using DashMap for concurrent access
pub struct WorkflowRegistry {
    workflows: Arc<DashMap<String, Box<dyn Workflow>>>,
    activities: Arc<DashMap<String, Box<dyn Activity>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self {
            workflows: Arc::new(DashMap::new()),
            activities: Arc::new(DashMap::new()),
        }
    }
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for WorkflowRegistry {
    fn clone(&self) -> Self {
        Self {
            workflows: Arc::clone(&self.workflows),
            activities: Arc::clone(&self.activities),
        }
    }
}

impl Registry for WorkflowRegistry {
    fn register_workflow(&self, name: &str, workflow: Box<dyn Workflow>) {
        self.workflows.insert(name.to_string(), workflow);
    }

    fn get_registered_workflows(&self) -> Vec<RegistryInfo> {
        let mut infos: Vec<_> = self
            .workflows
            .iter()
            .map(|entry| RegistryInfo {
                name: entry.key().clone(),
                type_name: "workflow".to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    fn register_activity(&self, name: &str, activity: Box<dyn Activity>) {
        self.activities.insert(name.to_string(), activity);
    }

    fn get_registered_activities(&self) -> Vec<RegistryInfo> {
        let mut infos: Vec<_> = self
            .activities
            .iter()
            .map(|entry| RegistryInfo {
                name: entry.key().clone(),
                type_name: "activity".to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    fn get_workflow(&self, name: &str) -> Option<Box<dyn Workflow>> {
        self.workflows.get(name).map(|entry| entry.clone())
    }

    fn get_activity(&self, name: &str) -> Option<Box<dyn Activity>> {
        self.activities.get(name).map(|entry| entry.clone())
    }
}
