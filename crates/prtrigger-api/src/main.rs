//! Pull-request build trigger server.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use prtrigger_api::bootstrap::{Backends, Scheduler, assemble};
use prtrigger_api::services::JenkinsTrigger;
use prtrigger_api::{AppState, routes};
use prtrigger_config::load_config;
use prtrigger_core::clock::SystemClock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prtrigger-server")]
#[command(about = "Debounced pull-request build trigger server", long_about = None)]
struct Args {
    /// Path to the KDL configuration file
    #[arg(long, env = "PRTRIGGER_CONFIG", default_value = "prtrigger.kdl")]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = load_config(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    let node_id = config
        .server
        .node_id
        .clone()
        .unwrap_or_else(|| format!("node-{}", uuid::Uuid::new_v4()));

    let database_url = std::env::var("DATABASE_URL")
        .ok()
        .or_else(|| config.server.database_url.clone());
    let backends = match database_url {
        Some(url) => Backends::postgres(&url).await?,
        None => {
            warn!("No database configured, running single-node with in-memory state");
            Backends::memory()
        }
    };

    let ci = Arc::new(JenkinsTrigger::new(&config.repositories));
    let Scheduler { intake, worker } =
        assemble(&config, &backends, &node_id, ci, Arc::new(SystemClock))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    let mut state = AppState::new(intake, node_id.as_str(), backends.storage);
    if let Some(secret) = config.server.webhook_secret.as_deref() {
        state = state.with_webhook_secret(secret);
    }

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    info!(
        node = %node_id,
        repositories = config.repositories.len(),
        "Starting server on {}",
        config.server.listen
    );
    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    worker_handle.await.context("worker task panicked")?;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
