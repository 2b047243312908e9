//! Testing utilities for durable workflows and activities.
//!
//! This crate provides a test framework for unit testing workflows and
//! activities without a running service or worker.

pub mod suite;

pub use suite::*;
