//! Async Completion Integration Test
//!
//! Runs a worker against the in-process service. The workflow starts a
//! payment, then waits on an activity that hands its task token to the
//! test instead of returning a result. The test completes or fails the
//! activity by token and checks what the workflow sees.
//!
//! ```bash
//! cargo test -p durable-worker --test async_completion_integration
//! ```

use durable_activity::ActivityContext;
use durable_client::{
    Client, ClientOptions, LocalWorkflowService, StartWorkflowOptions, WorkflowClient,
    WorkflowService,
};
use durable_core::{
    is_entity_not_exists_error, is_workflow_failed_error, ActivityOptions, DataConverter,
    DurableError, FailureKind, JsonDataConverter, RetryPolicy, TaskToken, WorkflowExecution,
};
use durable_worker::{
    Activity, ActivityError, DurableWorker, Worker, WorkerConfig, WorkerOptions, Workflow,
    WorkflowError,
};
use durable_workflow::WorkflowContext;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TASK_LIST: &str = "payment-confirmation";

// ============================================================================
// Activities
// ============================================================================

/// Fails the first attempt, succeeds afterwards
#[derive(Clone, Default)]
struct StartPaymentActivity {
    attempts: Arc<AtomicU32>,
}

impl Activity for StartPaymentActivity {
    fn execute(
        &self,
        ctx: &ActivityContext,
        _input: Option<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ActivityError>> + Send>> {
        let attempts = self.attempts.clone();
        let attempt = ctx.get_info().attempt;
        Box::pin(async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            if attempt == 1 {
                return Err(ActivityError::retryable("payment provider busy"));
            }
            Ok(Vec::new())
        })
    }
}

/// Publishes its task token and leaves the result pending
#[derive(Clone, Default)]
struct AwaitConfirmationActivity {
    token: Arc<Mutex<Option<TaskToken>>>,
}

impl Activity for AwaitConfirmationActivity {
    fn execute(
        &self,
        ctx: &ActivityContext,
        _input: Option<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ActivityError>> + Send>> {
        *self.token.lock() = Some(ctx.task_token().clone());
        Box::pin(async { Err(ActivityError::ResultPending) })
    }
}

#[derive(Clone)]
struct PanickingActivity;

impl Activity for PanickingActivity {
    fn execute(
        &self,
        _ctx: &ActivityContext,
        _input: Option<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ActivityError>> + Send>> {
        Box::pin(async { panic!("card reader exploded") })
    }
}

// ============================================================================
// Workflows
// ============================================================================

#[derive(Clone)]
struct PaymentConfirmationWorkflow;

impl Workflow for PaymentConfirmationWorkflow {
    fn execute(
        &self,
        ctx: WorkflowContext,
        _input: Option<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>> {
        Box::pin(async move {
            let options = ActivityOptions {
                schedule_to_start_timeout: Duration::from_secs(5),
                start_to_close_timeout: Duration::from_secs(5),
                retry_policy: Some(RetryPolicy {
                    initial_interval: Duration::from_millis(10),
                    maximum_attempts: 3,
                    ..Default::default()
                }),
                ..Default::default()
            };
            ctx.execute_activity("start_payment", None, options.clone())
                .await?;
            let confirmation = ctx
                .execute_activity(
                    "await_confirmation",
                    None,
                    ActivityOptions {
                        retry_policy: None,
                        ..options
                    },
                )
                .await?;
            Ok(confirmation)
        })
    }
}

#[derive(Clone)]
struct PanicWorkflow;

impl Workflow for PanicWorkflow {
    fn execute(
        &self,
        ctx: WorkflowContext,
        _input: Option<Vec<u8>>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, WorkflowError>> + Send>> {
        Box::pin(async move {
            ctx.execute_activity("panicking", None, ActivityOptions::default())
                .await
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    client: Arc<dyn Client>,
    worker: DurableWorker,
    start_payment: StartPaymentActivity,
    confirmation: AwaitConfirmationActivity,
}

fn harness() -> Harness {
    let service: Arc<dyn WorkflowService> = Arc::new(LocalWorkflowService::new());
    let client: Arc<dyn Client> = Arc::new(WorkflowClient::new(
        service.clone(),
        ClientOptions::default(),
    ));
    let start_payment = StartPaymentActivity::default();
    let confirmation = AwaitConfirmationActivity::default();

    let worker = DurableWorker::new(
        service,
        WorkerConfig::new(TASK_LIST)
            .with_workflow("payment_confirmation", PaymentConfirmationWorkflow)
            .with_workflow("panic_workflow", PanicWorkflow)
            .with_activity("start_payment", start_payment.clone())
            .with_activity("await_confirmation", confirmation.clone())
            .with_activity("panicking", PanickingActivity)
            .with_options(WorkerOptions {
                poll_timeout: Duration::from_millis(100),
                ..Default::default()
            }),
    )
    .unwrap();
    worker.start().unwrap();

    Harness {
        client,
        worker,
        start_payment,
        confirmation,
    }
}

async fn start(harness: &Harness, workflow_type: &str) -> WorkflowExecution {
    harness
        .client
        .start_workflow(
            StartWorkflowOptions {
                task_list: TASK_LIST.to_string(),
                ..Default::default()
            },
            workflow_type,
            None,
        )
        .await
        .unwrap()
}

async fn wait_for_token(harness: &Harness) -> TaskToken {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(token) = harness.confirmation.token.lock().clone() {
                return token;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("activity never published its token")
}

async fn result(harness: &Harness, execution: &WorkflowExecution) -> Result<Option<Vec<u8>>, DurableError> {
    tokio::time::timeout(
        Duration::from_secs(5),
        harness.client.get_workflow_result(execution),
    )
    .await
    .expect("workflow did not close")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_payment_confirmed_by_token() {
    let harness = harness();
    let execution = start(&harness, "payment_confirmation").await;

    let token = wait_for_token(&harness).await;
    let payload = JsonDataConverter.encode("CONFIRMED").unwrap();
    harness
        .client
        .complete_activity(&token, Some(&payload), None)
        .await
        .unwrap();

    let output = result(&harness, &execution).await.unwrap().unwrap();
    let confirmation: String = JsonDataConverter.decode(&output).unwrap();
    assert_eq!(confirmation, "CONFIRMED");
    assert_eq!(harness.start_payment.attempts.load(Ordering::SeqCst), 2);

    let again = harness
        .client
        .complete_activity(&token, Some(&payload), None)
        .await
        .unwrap_err();
    assert!(is_entity_not_exists_error(&again));

    harness.worker.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_payment_declined_by_token() {
    let harness = harness();
    let execution = start(&harness, "payment_confirmation").await;

    let token = wait_for_token(&harness).await;
    harness
        .client
        .complete_activity(&token, None, Some(DurableError::Other("declined".into())))
        .await
        .unwrap();

    let err = result(&harness, &execution).await.unwrap_err();
    assert!(is_workflow_failed_error(&err));
    match err {
        DurableError::WorkflowFailed(failure) => {
            assert_eq!(failure.kind, FailureKind::ActivityFailed);
            assert!(failure.message.contains("declined"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    harness.worker.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_activity_panic_fails_workflow() {
    let harness = harness();
    let execution = start(&harness, "panic_workflow").await;

    let err = result(&harness, &execution).await.unwrap_err();
    match err {
        DurableError::WorkflowFailed(failure) => {
            assert!(failure.message.contains("card reader exploded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    harness.worker.stop();
}
