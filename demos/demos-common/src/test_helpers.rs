//! Test helpers for setting up test environments.

use durable_testsuite::TestWorkflowEnvironment;

use crate::tracing_setup::init_test_tracing;

/// Create a new test workflow environment with test tracing enabled.
pub fn setup_test_env() -> TestWorkflowEnvironment {
    init_test_tracing();
    TestWorkflowEnvironment::new()
}
