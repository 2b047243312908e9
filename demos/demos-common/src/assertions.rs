//! Assertion helpers for workflow unit tests.

use durable_testsuite::TestWorkflowEnvironment;

/// Assert that an activity was executed a specific number of times.
pub fn assert_activity_executed_n_times(
    env: &TestWorkflowEnvironment,
    activity_name: &str,
    expected_count: usize,
) {
    let actual = env.activity_execution_count(activity_name);
    assert_eq!(
        actual,
        expected_count,
        "activity '{}' executed {} times, expected {} (executed: {:?})",
        activity_name,
        actual,
        expected_count,
        env.get_executed_activities()
    );
}

/// Assert that an activity never ran.
pub fn assert_activity_not_executed(env: &TestWorkflowEnvironment, activity_name: &str) {
    assert!(
        !env.was_activity_executed(activity_name),
        "activity '{}' was executed (executed: {:?})",
        activity_name,
        env.get_executed_activities()
    );
}

/// Assert the exact order activities were scheduled in.
pub fn assert_activity_sequence(env: &TestWorkflowEnvironment, expected: &[&str]) {
    assert_eq!(env.get_executed_activities(), expected);
}
