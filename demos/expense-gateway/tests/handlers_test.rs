//! Gateway handler tests driving the router with `oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use durable_client::{Client, DescribeWorkflowExecutionResponse, StartWorkflowOptions};
use durable_core::{DurableError, DurableResult, ServerError, TaskToken, WorkflowExecution};
use expense_approval::{ExpenseConfig, ExpenseStatus};
use expense_gateway::{create_router, AppState, ExpenseStore};
use parking_lot::Mutex;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingClient {
    started: Mutex<Vec<String>>,
    completed: Mutex<Vec<(TaskToken, Vec<u8>)>>,
    fail_start: bool,
    fail_complete: bool,
}

#[async_trait]
impl Client for RecordingClient {
    async fn start_workflow(
        &self,
        options: StartWorkflowOptions,
        _workflow_type: &str,
        _args: Option<&[u8]>,
    ) -> DurableResult<WorkflowExecution> {
        if self.fail_start {
            return Err(DurableError::Transport("service unavailable".into()));
        }
        self.started.lock().push(options.id.clone());
        Ok(WorkflowExecution::new(options.id, "run-1"))
    }

    async fn terminate_workflow(
        &self,
        _workflow_id: &str,
        _run_id: Option<&str>,
        _reason: &str,
    ) -> DurableResult<()> {
        Ok(())
    }

    async fn complete_activity(
        &self,
        task_token: &TaskToken,
        result: Option<&[u8]>,
        _error: Option<DurableError>,
    ) -> DurableResult<()> {
        if self.fail_complete {
            return Err(ServerError::EntityNotExists {
                message: "token revoked".into(),
            }
            .into());
        }
        self.completed
            .lock()
            .push((task_token.clone(), result.unwrap_or_default().to_vec()));
        Ok(())
    }

    async fn get_workflow_result(
        &self,
        _execution: &WorkflowExecution,
    ) -> DurableResult<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn describe_workflow_execution(
        &self,
        _execution: &WorkflowExecution,
    ) -> DurableResult<DescribeWorkflowExecutionResponse> {
        Err(DurableError::Other("not supported".into()))
    }
}

struct TestApp {
    router: Router,
    store: Arc<ExpenseStore>,
    client: Arc<RecordingClient>,
}

fn app_with(client: RecordingClient) -> TestApp {
    let store = Arc::new(ExpenseStore::new());
    let client = Arc::new(client);
    let config = ExpenseConfig {
        settle_ms: 10,
        ..Default::default()
    };
    let state = AppState::new(store.clone(), client.clone(), config);
    TestApp {
        router: create_router(state),
        store,
        client,
    }
}

fn app() -> TestApp {
    app_with(RecordingClient::default())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn register(router: &Router, id: &str, form: &str) -> (StatusCode, String) {
    let request = Request::post(format!("/registerCallback?id={}", id))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    send(router, request).await
}

#[tokio::test]
async fn test_create_api_call() {
    let app = app();

    assert_eq!(
        get(&app.router, "/create?is_api_call=true&id=1").await,
        (StatusCode::OK, "SUCCEED".to_string())
    );
    assert_eq!(
        get(&app.router, "/create?is_api_call=true&id=1").await,
        (StatusCode::OK, "ERROR:ID_ALREADY_EXISTS".to_string())
    );
    assert_eq!(app.store.status("1"), Ok(ExpenseStatus::Created));
}

#[tokio::test]
async fn test_create_without_api_call_renders_list() {
    let app = app();
    let (status, body) = get(&app.router, "/create?id=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<table>"));
    assert!(body.contains("abc"));
}

#[tokio::test]
async fn test_status() {
    let app = app();
    app.store.create("1").unwrap();

    assert_eq!(get(&app.router, "/status?id=1").await.1, "CREATED");
    assert_eq!(get(&app.router, "/status?id=2").await.1, "ERROR:INVALID_ID");
    assert_eq!(get(&app.router, "/status").await.1, "ERROR:INVALID_ID");
}

#[tokio::test]
async fn test_approve_resumes_workflow_once() {
    let app = app();
    app.store.create("1").unwrap();
    let token = TaskToken::random();
    let (_, body) = register(&app.router, "1", &format!("task_token={}", token.to_hex())).await;
    assert_eq!(body, "SUCCEED");

    let (status, body) = get(&app.router, "/action?is_api_call=true&type=approve&id=1").await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "SUCCEED"));
    assert_eq!(app.store.status("1"), Ok(ExpenseStatus::Approved));

    get(&app.router, "/action?is_api_call=true&type=approve&id=1").await;

    let completed = app.client.completed.lock().clone();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].0, token);
    let decision: String = serde_json::from_slice(&completed[0].1).unwrap();
    assert_eq!(decision, "APPROVED");
}

#[tokio::test]
async fn test_decision_without_waiting_workflow() {
    let app = app();
    app.store.create("1").unwrap();

    let (_, body) = get(&app.router, "/action?is_api_call=true&type=reject&id=1").await;
    assert_eq!(body, "SUCCEED");
    assert!(app.client.completed.lock().is_empty());
}

#[tokio::test]
async fn test_resume_failure_keeps_decision() {
    let app = app_with(RecordingClient {
        fail_complete: true,
        ..Default::default()
    });
    app.store.create("1").unwrap();
    app.store.register_callback("1", TaskToken::random()).unwrap();

    let (status, body) = get(&app.router, "/action?is_api_call=true&type=reject&id=1").await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "SUCCEED"));
    assert_eq!(app.store.status("1"), Ok(ExpenseStatus::Rejected));
}

#[tokio::test]
async fn test_rejected_cannot_be_paid() {
    let app = app();
    app.store.create("1").unwrap();
    get(&app.router, "/action?is_api_call=true&type=reject&id=1").await;

    let (_, body) = get(&app.router, "/action?is_api_call=true&type=payment&id=1").await;
    assert_eq!(body, "ERROR:INVALID_STATE");
    assert_eq!(app.store.status("1"), Ok(ExpenseStatus::Rejected));
}

#[tokio::test]
async fn test_action_errors() {
    let app = app();
    app.store.create("1").unwrap();

    assert_eq!(
        get(&app.router, "/action?is_api_call=true&type=approve&id=9").await.1,
        "ERROR:INVALID_ID"
    );
    assert_eq!(
        get(&app.router, "/action?is_api_call=true&type=refund&id=1").await.1,
        "ERROR:INVALID_ACTION"
    );
}

#[tokio::test]
async fn test_action_without_api_call_redirects() {
    let app = app();
    app.store.create("1").unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get("/action?type=approve&id=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/list");
}

#[tokio::test]
async fn test_register_callback_errors() {
    let app = app();
    let token = TaskToken::random().to_hex();

    assert_eq!(
        register(&app.router, "1", &format!("task_token={}", token)).await.1,
        "ERROR:INVALID_ID"
    );

    app.store.create("1").unwrap();
    assert_eq!(
        register(&app.router, "1", "task_token=zz").await.1,
        "ERROR:INVALID_FORM_DATA"
    );
    assert_eq!(
        register(&app.router, "1", "other=1").await.1,
        "ERROR:INVALID_FORM_DATA"
    );

    app.store.approve("1").unwrap();
    assert_eq!(
        register(&app.router, "1", &format!("task_token={}", token)).await.1,
        "ERROR:INVALID_STATE"
    );
}

#[tokio::test]
async fn test_register_callback_checks_expense_before_form() {
    let app = app();

    assert_eq!(
        register(&app.router, "missing", "task_token=zz").await.1,
        "ERROR:INVALID_ID"
    );

    app.store.create("1").unwrap();
    app.store.approve("1").unwrap();
    assert_eq!(register(&app.router, "1", "").await.1, "ERROR:INVALID_STATE");
    assert!(!app.store.has_callback("1"));
}

#[tokio::test]
async fn test_list_page() {
    let app = app();
    app.store.create("b").unwrap();
    app.store.create("a").unwrap();
    app.store.approve("b").unwrap();

    for uri in ["/", "/list"] {
        let (status, body) = get(&app.router, uri).await;
        assert_eq!(status, StatusCode::OK);
        let a = body.find(">a<").unwrap();
        let b = body.find(">b<").unwrap();
        assert!(a < b);
        assert!(body.contains("APPROVE"));
    }
}

#[tokio::test]
async fn test_new_starts_workflow() {
    let app = app();

    let (status, body) = get(&app.router, "/new?is_api_call=true").await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "SUCCEED"));

    let started = app.client.started.lock().clone();
    assert_eq!(started.len(), 1);
    assert!(started[0].starts_with("expense_"));
}

#[tokio::test]
async fn test_new_start_failure() {
    let app = app_with(RecordingClient {
        fail_start: true,
        ..Default::default()
    });

    let (status, body) = get(&app.router, "/new?is_api_call=true").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "ERROR:START_FAILED");
}
