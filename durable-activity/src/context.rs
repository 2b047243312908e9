//! Activity context and functions for authoring activities.
//!
//! An activity reads its task token from here when it intends to complete
//! asynchronously.

use std::time::{Duration, Instant};

use durable_core::{TaskToken, WorkflowExecution};

/// Activity context for executing activity logic
#[derive(Debug, Clone)]
pub struct ActivityContext {
    activity_info: ActivityInfo,
    worker_stop_channel: Option<tokio::sync::watch::Receiver<bool>>,
}

impl ActivityContext {
    pub fn new(activity_info: ActivityInfo) -> Self {
        Self {
            activity_info,
            worker_stop_channel: None,
        }
    }

    /// Set the worker stop channel
    pub fn set_worker_stop_channel(&mut self, channel: tokio::sync::watch::Receiver<bool>) {
        self.worker_stop_channel = Some(channel);
    }

    /// Get activity information
    pub fn get_info(&self) -> &ActivityInfo {
        &self.activity_info
    }

    /// Token that completes this attempt out of band
    pub fn task_token(&self) -> &TaskToken {
        &self.activity_info.task_token
    }

    /// Whether the hosting worker has been asked to stop
    pub fn is_worker_stopping(&self) -> bool {
        self.worker_stop_channel
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }

    /// Get the deadline for activity completion
    pub fn get_deadline(&self) -> Option<Instant> {
        self.activity_info.deadline
    }

    /// Get the remaining time before deadline
    pub fn get_remaining_time(&self) -> Option<Duration> {
        self.activity_info
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// Activity information
#[derive(Debug, Clone)]
pub struct ActivityInfo {
    pub activity_id: String,
    pub activity_type: String,
    pub task_token: TaskToken,
    pub workflow_execution: WorkflowExecution,
    pub task_list: String,
    pub attempt: u32,
    pub scheduled_time: chrono::DateTime<chrono::Utc>,
    pub started_time: chrono::DateTime<chrono::Utc>,
    pub deadline: Option<Instant>,
}

/// Get activity info from context (convenience function)
pub fn get_info(ctx: &ActivityContext) -> &ActivityInfo {
    ctx.get_info()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(deadline: Option<Instant>) -> ActivityInfo {
        ActivityInfo {
            activity_id: "1".to_string(),
            activity_type: "wait_for_decision".to_string(),
            task_token: TaskToken::new(vec![1, 2, 3]),
            workflow_execution: WorkflowExecution::new("expense_1", "run-1"),
            task_list: "expenseGroup".to_string(),
            attempt: 1,
            scheduled_time: chrono::Utc::now(),
            started_time: chrono::Utc::now(),
            deadline,
        }
    }

    #[test]
    fn test_context_exposes_task_token() {
        let ctx = ActivityContext::new(info(None));
        assert_eq!(ctx.task_token().to_hex(), "010203");
        assert_eq!(get_info(&ctx).activity_type, "wait_for_decision");
        assert!(ctx.get_remaining_time().is_none());
    }

    #[test]
    fn test_expired_deadline_has_no_remaining_time() {
        let past = Instant::now() - Duration::from_millis(5);
        let ctx = ActivityContext::new(info(Some(past)));
        assert_eq!(ctx.get_remaining_time(), Some(Duration::ZERO));
    }

    #[test]
    fn test_worker_stop_channel() {
        let (tx, rx) = tokio::sync::watch::channel(false);
        let mut ctx = ActivityContext::new(info(None));
        assert!(!ctx.is_worker_stopping());

        ctx.set_worker_stop_channel(rx);
        assert!(!ctx.is_worker_stopping());
        tx.send(true).unwrap();
        assert!(ctx.is_worker_stopping());
    }
}
