//! Wires the in-process durable service, the expense worker and the HTTP
//! gateway into one process.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use durable_client::{Client, ClientOptions, LocalWorkflowService, WorkflowClient, WorkflowService};
use durable_worker::{DurableWorker, Worker, WorkerOptions};
use expense_approval::{build_expense_worker, ExpenseConfig, HttpGateway};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::BootstrapError;
use crate::handlers::{create_router, AppState};
use crate::store::ExpenseStore;

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub listen: SocketAddr,
    /// Gateway URL the activities call, the bound address when unset
    pub gateway_url: Option<String>,
    pub expense: ExpenseConfig,
    pub worker: WorkerOptions,
}

/// A bound, not yet serving, expense server
pub struct ExpenseServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: AppState,
    worker: Arc<DurableWorker>,
}

impl ExpenseServer {
    /// Bind the listener and build the worker
    pub async fn bind(options: ServerOptions) -> Result<Self, BootstrapError> {
        let listener = TcpListener::bind(options.listen).await?;
        let local_addr = listener.local_addr()?;

        let mut expense = options.expense;
        expense.gateway_url = options
            .gateway_url
            .unwrap_or_else(|| format!("http://{}", local_addr));
        expense.validate()?;

        let service: Arc<dyn WorkflowService> = Arc::new(LocalWorkflowService::new());
        let client: Arc<dyn Client> = Arc::new(WorkflowClient::new(
            service.clone(),
            ClientOptions {
                identity: options.worker.identity.clone(),
            },
        ));
        let gateway = Arc::new(HttpGateway::new(&expense.gateway_url)?);
        let worker = build_expense_worker(service, &expense, gateway, options.worker)?;

        info!(
            listen = %local_addr,
            gateway_url = %expense.gateway_url,
            task_list = %expense.task_list,
            "expense server bound"
        );
        Ok(Self {
            listener,
            local_addr,
            state: AppState::new(Arc::new(ExpenseStore::new()), client, expense),
            worker: Arc::new(worker),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until Ctrl+C, then stop the worker
    pub async fn run(self) -> Result<(), BootstrapError> {
        self.worker.start()?;
        let router = create_router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(wait_for_shutdown(tokio::signal::ctrl_c()))
            .await?;
        self.worker.stop();
        info!("expense server stopped");
        Ok(())
    }

    /// Serve in the background
    pub fn spawn(self) -> Result<ServerHandle, BootstrapError> {
        self.worker.start()?;
        let store = self.state.store.clone();
        let client = self.state.client.clone();
        let config = self.state.config.as_ref().clone();

        let router = create_router(self.state);
        let listener = self.listener;
        let serve = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "expense server failed");
            }
        });

        Ok(ServerHandle {
            local_addr: self.local_addr,
            store,
            client,
            config,
            worker: self.worker,
            serve: Some(serve),
        })
    }
}

/// Resolves when `signal` fires, or right away if it could not be installed
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "failed to listen for Ctrl+C, shutting down"),
    }
}

/// Handle to a server started with `ExpenseServer::spawn`
pub struct ServerHandle {
    local_addr: SocketAddr,
    store: Arc<ExpenseStore>,
    client: Arc<dyn Client>,
    config: ExpenseConfig,
    worker: Arc<DurableWorker>,
    serve: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    pub fn store(&self) -> &Arc<ExpenseStore> {
        &self.store
    }

    pub fn client(&self) -> Arc<dyn Client> {
        self.client.clone()
    }

    pub fn config(&self) -> &ExpenseConfig {
        &self.config
    }

    pub fn shutdown(mut self) {
        self.worker.stop();
        if let Some(serve) = self.serve.take() {
            serve.abort();
        }
    }
}
