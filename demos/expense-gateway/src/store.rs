//! In-memory expense store.
//!
//! Statuses and pending task tokens live behind one lock, so every
//! check-then-write is a single critical section.

use std::collections::HashMap;

use durable_core::TaskToken;
use expense_approval::{ExpenseRequest, ExpenseStatus};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("expense '{0}' already exists")]
    DuplicateId(String),

    #[error("expense '{0}' does not exist")]
    UnknownId(String),

    #[error("expense '{id}' is {status}, cannot become {requested}")]
    InvalidState {
        id: String,
        status: ExpenseStatus,
        requested: ExpenseStatus,
    },
}

/// Result of a successful status change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub status: ExpenseStatus,
    /// False when the request already had the requested status
    pub changed: bool,
    /// Token taken out of the store by a human decision
    pub token: Option<TaskToken>,
}

#[derive(Debug, Default)]
struct Inner {
    expenses: HashMap<String, ExpenseStatus>,
    tokens: HashMap<String, TaskToken>,
}

#[derive(Debug, Default)]
pub struct ExpenseStore {
    inner: Mutex<Inner>,
}

impl ExpenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.expenses.contains_key(id) {
            return Err(StoreError::DuplicateId(id.to_string()));
        }
        inner.expenses.insert(id.to_string(), ExpenseStatus::Created);
        info!(expense_id = %id, "expense created");
        Ok(())
    }

    pub fn approve(&self, id: &str) -> Result<Transition, StoreError> {
        self.transition(id, ExpenseStatus::Approved)
    }

    pub fn reject(&self, id: &str) -> Result<Transition, StoreError> {
        self.transition(id, ExpenseStatus::Rejected)
    }

    pub fn mark_paid(&self, id: &str) -> Result<Transition, StoreError> {
        self.transition(id, ExpenseStatus::Completed)
    }

    /// Move `id` to `next`
    ///
    /// Repeating the current status is a no-op. A human decision out of
    /// `Created` consumes the registered token.
    pub fn transition(&self, id: &str, next: ExpenseStatus) -> Result<Transition, StoreError> {
        let mut inner = self.inner.lock();
        let current = *inner
            .expenses
            .get(id)
            .ok_or_else(|| StoreError::UnknownId(id.to_string()))?;

        if current == next {
            debug!(expense_id = %id, status = %current, "status unchanged");
            return Ok(Transition {
                status: current,
                changed: false,
                token: None,
            });
        }
        if !current.can_transition_to(next) {
            return Err(StoreError::InvalidState {
                id: id.to_string(),
                status: current,
                requested: next,
            });
        }

        inner.expenses.insert(id.to_string(), next);
        let token = if current == ExpenseStatus::Created && next.is_decision() {
            inner.tokens.remove(id)
        } else {
            None
        };
        info!(expense_id = %id, from = %current, to = %next, "expense status changed");
        Ok(Transition {
            status: next,
            changed: true,
            token,
        })
    }

    /// Check that `id` exists and still waits for a decision
    pub fn check_awaiting_decision(&self, id: &str) -> Result<(), StoreError> {
        Self::awaiting_decision(&self.inner.lock(), id)
    }

    fn awaiting_decision(inner: &Inner, id: &str) -> Result<(), StoreError> {
        let status = *inner
            .expenses
            .get(id)
            .ok_or_else(|| StoreError::UnknownId(id.to_string()))?;
        if status != ExpenseStatus::Created {
            return Err(StoreError::InvalidState {
                id: id.to_string(),
                status,
                requested: ExpenseStatus::Created,
            });
        }
        Ok(())
    }

    /// Store the decision token for `id`, returning the token it replaced
    pub fn register_callback(
        &self,
        id: &str,
        token: TaskToken,
    ) -> Result<Option<TaskToken>, StoreError> {
        let mut inner = self.inner.lock();
        Self::awaiting_decision(&inner, id)?;
        let replaced = inner.tokens.insert(id.to_string(), token);
        if let Some(previous) = &replaced {
            info!(expense_id = %id, previous = %previous, "replaced registered callback");
        } else {
            info!(expense_id = %id, "callback registered");
        }
        Ok(replaced)
    }

    pub fn status(&self, id: &str) -> Result<ExpenseStatus, StoreError> {
        self.inner
            .lock()
            .expenses
            .get(id)
            .copied()
            .ok_or_else(|| StoreError::UnknownId(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().expenses.contains_key(id)
    }

    pub fn has_callback(&self, id: &str) -> bool {
        self.inner.lock().tokens.contains_key(id)
    }

    /// All requests sorted by id
    pub fn list(&self) -> Vec<ExpenseRequest> {
        let inner = self.inner.lock();
        let mut expenses: Vec<ExpenseRequest> = inner
            .expenses
            .iter()
            .map(|(id, status)| ExpenseRequest {
                id: id.clone(),
                status: *status,
            })
            .collect();
        expenses.sort_by(|a, b| a.id.cmp(&b.id));
        expenses
    }
}
