//! Expense gateway
//!
//! HTTP front end of the expense approval saga. It keeps the in-memory
//! registry of expense requests and their pending decision tokens, and
//! resumes the waiting workflow when a person approves or rejects.

pub mod error;
pub mod handlers;
pub mod notifier;
pub mod server;
pub mod store;
pub mod templates;

pub use error::{BootstrapError, GatewayError};
pub use handlers::{create_router, AppState};
pub use notifier::{DecisionNotifier, ResumeError};
pub use server::{ExpenseServer, ServerHandle, ServerOptions};
pub use store::{ExpenseStore, StoreError, Transition};
