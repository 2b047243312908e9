//! HTTP handlers for the expense gateway.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::FormRejection, Form, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use durable_client::Client;
use durable_core::TaskToken;
use expense_approval::{start_expense_workflow, ExpenseConfig, ExpenseStatus};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::notifier::DecisionNotifier;
use crate::store::ExpenseStore;
use crate::templates;

const SUCCEED: &str = "SUCCEED";
const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ExpenseStore>,
    pub client: Arc<dyn Client>,
    pub notifier: DecisionNotifier,
    pub config: Arc<ExpenseConfig>,
}

impl AppState {
    pub fn new(store: Arc<ExpenseStore>, client: Arc<dyn Client>, config: ExpenseConfig) -> Self {
        Self {
            store,
            notifier: DecisionNotifier::new(client.clone()),
            client,
            config: Arc::new(config),
        }
    }
}

/// Create the gateway router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list))
        .route("/list", get(list))
        .route("/new", get(new_expense))
        .route("/create", get(create))
        .route("/action", get(action))
        .route("/status", get(status))
        .route("/registerCallback", post(register_callback))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ExpenseParams {
    id: Option<String>,
    #[serde(rename = "type")]
    action: Option<String>,
    is_api_call: Option<String>,
}

impl ExpenseParams {
    fn is_api_call(&self) -> bool {
        self.is_api_call.as_deref() == Some("true")
    }

    fn id(&self) -> Result<&str, GatewayError> {
        self.id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GatewayError::UnknownId(String::new()))
    }
}

#[derive(Debug, Deserialize)]
struct CallbackForm {
    task_token: Option<String>,
}

fn redirect_to_list() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/list")]).into_response()
}

fn render_list(store: &ExpenseStore) -> Html<String> {
    Html(templates::expense_list(&store.list()).into_string())
}

async fn list(State(state): State<AppState>) -> Html<String> {
    render_list(&state.store)
}

async fn new_expense(
    State(state): State<AppState>,
    Query(params): Query<ExpenseParams>,
) -> Result<Response, GatewayError> {
    let expense_id = uuid::Uuid::new_v4().to_string();
    let execution = start_expense_workflow(state.client.clone(), &state.config, &expense_id)
        .await
        .map_err(|e| {
            warn!(expense_id = %expense_id, error = %e, "failed to start expense workflow");
            GatewayError::StartFailed(e.to_string())
        })?;
    info!(
        expense_id = %expense_id,
        workflow_id = %execution.workflow_id,
        run_id = %execution.run_id,
        "expense workflow started"
    );

    let settled = tokio::time::timeout(state.config.settle_window(), async {
        while !state.store.contains(&expense_id) {
            tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
        }
    })
    .await;
    if settled.is_err() {
        info!(expense_id = %expense_id, "expense not visible yet, continuing");
    }

    if params.is_api_call() {
        Ok(SUCCEED.into_response())
    } else {
        Ok(redirect_to_list())
    }
}

async fn create(
    State(state): State<AppState>,
    Query(params): Query<ExpenseParams>,
) -> Result<Response, GatewayError> {
    let id = params.id()?;
    state.store.create(id)?;
    if params.is_api_call() {
        Ok(SUCCEED.into_response())
    } else {
        Ok(render_list(&state.store).into_response())
    }
}

async fn action(
    State(state): State<AppState>,
    Query(params): Query<ExpenseParams>,
) -> Result<Response, GatewayError> {
    let id = params.id()?;
    let next = match params.action.as_deref() {
        Some("approve") => ExpenseStatus::Approved,
        Some("reject") => ExpenseStatus::Rejected,
        Some("payment") => ExpenseStatus::Completed,
        other => {
            return Err(GatewayError::InvalidAction(
                other.unwrap_or_default().to_string(),
            ))
        }
    };

    let transition = state.store.transition(id, next)?;
    state.notifier.notify(id, &transition).await;

    if params.is_api_call() {
        Ok(SUCCEED.into_response())
    } else {
        Ok(redirect_to_list())
    }
}

async fn status(
    State(state): State<AppState>,
    Query(params): Query<ExpenseParams>,
) -> Result<String, GatewayError> {
    let id = params.id()?;
    Ok(state.store.status(id)?.to_string())
}

async fn register_callback(
    State(state): State<AppState>,
    Query(params): Query<ExpenseParams>,
    form: Result<Form<CallbackForm>, FormRejection>,
) -> Result<&'static str, GatewayError> {
    let id = params.id()?;
    state.store.check_awaiting_decision(id)?;
    let Form(form) = form.map_err(|e| GatewayError::InvalidFormData(e.body_text()))?;
    let encoded = form
        .task_token
        .ok_or_else(|| GatewayError::InvalidFormData("missing task_token".to_string()))?;
    let token = TaskToken::from_hex(&encoded)
        .map_err(|e| GatewayError::InvalidFormData(e.to_string()))?;

    state.store.register_callback(id, token)?;
    Ok(SUCCEED)
}
