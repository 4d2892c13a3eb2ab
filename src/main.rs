//! Tarefas API
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!   lambda mode    │                      Adapter                         │
//!   invocation ───▶│  normalize ─▶ Cors ─▶ BodyParsing ─▶ Router ─▶ handler│
//!   event          │      │                                        │      │
//!                  │      ▼                                        ▼      │
//!   serve mode     │  InvocationEvent                    NormalizedResponse│
//!   HTTP ─▶ axum ─▶│  (payload 2.0)                                │      │
//!                  │                                     serialize ◀┘      │
//!                  └──────────────────────────────────────────────────────┘
//! ```
//!
//! Mode defaults to `lambda` when the Lambda runtime API is present in the
//! environment, `serve` otherwise.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tokio::net::TcpListener;

use tarefas_api::config::{load_config, AppConfig};
use tarefas_api::http::{InvocationContext, LocalServer};
use tarefas_api::observability::{logging, metrics};
use tarefas_api::Adapter;

#[derive(Parser)]
#[command(name = "tarefas-api", version)]
#[command(about = "Tarefas HTTP API behind a serverless invocation adapter", long_about = None)]
struct Cli {
    /// TOML configuration file [default: config/default.toml if present]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Receive invocations from the Lambda runtime API
    Lambda,
    /// Serve HTTP locally through the same adapter
    Serve,
}

impl Mode {
    fn detect() -> Self {
        if std::env::var_os("AWS_LAMBDA_RUNTIME_API").is_some() {
            Mode::Lambda
        } else {
            Mode::Serve
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    let mode = cli.mode.unwrap_or_else(Mode::detect);

    let mut config = load_config(cli.config.as_deref())?;
    if mode == Mode::Lambda {
        config.observability.json_logs = true;
    }
    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = ?mode,
        max_body_bytes = config.limits.max_body_bytes,
        "tarefas-api starting"
    );

    let adapter = Arc::new(Adapter::from_config(&config));

    match mode {
        Mode::Lambda => run_lambda(adapter).await?,
        Mode::Serve => run_server(adapter, &config).await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_lambda(adapter: Arc<Adapter>) -> Result<(), Error> {
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let adapter = adapter.clone();
        async move {
            let LambdaEvent { payload, context } = event;
            let context = InvocationContext::new(context.request_id)
                .with_deadline(UNIX_EPOCH + Duration::from_millis(context.deadline));
            Ok::<_, Error>(adapter.handle_value(payload, Some(context)).await)
        }
    }))
    .await
}

async fn run_server(adapter: Arc<Adapter>, config: &AppConfig) -> Result<(), Error> {
    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    LocalServer::new(adapter).run(listener).await?;
    Ok(())
}
