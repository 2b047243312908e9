//! Commands a workflow hands to the runtime.

use durable_core::ActivityOptions;

/// Command emitted by workflow code through its `CommandSink`
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowCommand {
    ScheduleActivity(ScheduleActivityCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleActivityCommand {
    pub activity_id: String,
    pub activity_type: String,
    pub args: Option<Vec<u8>>,
    pub options: ActivityOptions,
}
