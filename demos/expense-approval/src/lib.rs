//! Expense approval saga
//!
//! An expense request is created on the expense gateway, then the workflow
//! waits for a person to approve or reject it, and pays approved requests.
//!
//! ## Flow
//!
//! - `create_expense_activity` records the request on the gateway
//! - `wait_for_decision_activity` registers its task token with the gateway
//!   and returns without a result; the gateway completes it by token once a
//!   decision is made
//! - `payment_activity` runs only for approved requests
//!
//! The workflow result is `"COMPLETED"` after payment and an empty string
//! for rejected requests.

pub mod activities;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod worker;
pub mod workflows;

pub use activities::*;
pub use config::*;
pub use error::*;
pub use gateway::*;
pub use models::*;
pub use worker::*;
pub use workflows::*;
