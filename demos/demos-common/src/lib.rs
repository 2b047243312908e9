//! Shared utilities for the demo crates.
//!
//! Tracing setup for binaries and tests, plus assertion helpers over the
//! in-process test workflow environment.

pub mod assertions;
pub mod test_helpers;
pub mod tracing_setup;

pub use assertions::*;
pub use test_helpers::*;
pub use tracing_setup::*;
