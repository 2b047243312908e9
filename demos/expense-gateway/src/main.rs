//! # Expense Server
//!
//! Runs the expense gateway together with an embedded worker polling the
//! expense task list on the in-process durable service.
//!
//! ```bash
//! cargo run -p expense-gateway --bin expense-server -- --listen 127.0.0.1:8099
//! ```
//!
//! Open `http://127.0.0.1:8099/list`, create a request with NEW EXPENSE and
//! approve or reject it.

use std::net::SocketAddr;

use clap::Parser;
use demos_common::init_tracing;
use durable_worker::WorkerOptions;
use expense_approval::{ExpenseConfig, DEFAULT_TASK_LIST};
use expense_gateway::{ExpenseServer, ServerOptions};

#[derive(Debug, Parser)]
#[command(name = "expense-server", about = "Expense approval gateway and worker")]
struct Args {
    /// Address the gateway listens on
    #[arg(long, env = "EXPENSE_LISTEN", default_value = "127.0.0.1:8099")]
    listen: SocketAddr,

    /// Task list the worker polls
    #[arg(long, env = "EXPENSE_TASK_LIST", default_value = DEFAULT_TASK_LIST)]
    task_list: String,

    /// How long a request may wait for approval
    #[arg(long, env = "EXPENSE_DECISION_TIMEOUT_SECS", default_value_t = 600)]
    decision_timeout_secs: u64,

    /// Gateway URL the activities call, defaults to the listen address
    #[arg(long, env = "EXPENSE_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// How long /new waits for the new request to show up
    #[arg(long, env = "EXPENSE_SETTLE_MS", default_value_t = 1000)]
    settle_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let expense = ExpenseConfig {
        task_list: args.task_list,
        decision_timeout_secs: args.decision_timeout_secs,
        settle_ms: args.settle_ms,
        ..Default::default()
    };
    let server = ExpenseServer::bind(ServerOptions {
        listen: args.listen,
        gateway_url: args.gateway_url,
        expense,
        worker: WorkerOptions::default(),
    })
    .await?;

    println!("Expense server listening on http://{}/list", server.local_addr());
    server.run().await?;
    Ok(())
}
