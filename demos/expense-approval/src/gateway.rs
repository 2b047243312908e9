//! HTTP client for the expense gateway.
//!
//! The gateway answers API calls with a plain-text body: `SUCCEED` or
//! `ERROR:<code>`.

use std::time::Duration;

use async_trait::async_trait;
use durable_core::TaskToken;
use tracing::debug;

use crate::error::GatewayCallError;

const SUCCEED: &str = "SUCCEED";
const ERROR_PREFIX: &str = "ERROR:";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Operations the activities perform against the gateway
#[async_trait]
pub trait ExpenseGateway: Send + Sync {
    /// Record a new expense request
    async fn create_expense(&self, expense_id: &str) -> Result<(), GatewayCallError>;

    /// Hand the decision activity's task token to the gateway
    async fn register_callback(
        &self,
        expense_id: &str,
        task_token: &TaskToken,
    ) -> Result<(), GatewayCallError>;

    /// Mark an approved request as paid
    async fn pay(&self, expense_id: &str) -> Result<(), GatewayCallError>;
}

/// Map a gateway response body to a call result
pub fn parse_gateway_response(body: &str) -> Result<(), GatewayCallError> {
    let body = body.trim();
    if body == SUCCEED {
        Ok(())
    } else if let Some(code) = body.strip_prefix(ERROR_PREFIX) {
        Err(GatewayCallError::Rejected(code.to_string()))
    } else {
        Err(GatewayCallError::UnexpectedResponse(body.to_string()))
    }
}

/// `ExpenseGateway` over HTTP
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayCallError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayCallError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(), GatewayCallError> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayCallError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayCallError::Transport(e.to_string()))?;
        debug!(status = %status, body = %body, "gateway response");
        if !status.is_success() {
            return Err(GatewayCallError::UnexpectedResponse(format!(
                "HTTP {}: {}",
                status, body
            )));
        }
        parse_gateway_response(&body)
    }
}

#[async_trait]
impl ExpenseGateway for HttpGateway {
    async fn create_expense(&self, expense_id: &str) -> Result<(), GatewayCallError> {
        let request = self
            .client
            .get(self.url("/create"))
            .query(&[("is_api_call", "true"), ("id", expense_id)]);
        self.send(request).await
    }

    async fn register_callback(
        &self,
        expense_id: &str,
        task_token: &TaskToken,
    ) -> Result<(), GatewayCallError> {
        let request = self
            .client
            .post(self.url("/registerCallback"))
            .query(&[("id", expense_id)])
            .form(&[("task_token", task_token.to_hex())]);
        self.send(request).await
    }

    async fn pay(&self, expense_id: &str) -> Result<(), GatewayCallError> {
        let request = self.client.get(self.url("/action")).query(&[
            ("is_api_call", "true"),
            ("type", "payment"),
            ("id", expense_id),
        ]);
        self.send(request).await
    }
}
