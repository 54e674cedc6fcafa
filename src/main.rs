#![forbid(unsafe_code)]

//! `atlas-gateway` — governance gateway server binary.
//!
//! Bootstraps configuration, the workflow store, the audit log, the risk
//! evaluator client, and the HTTP surface, then runs until interrupted.
//! Workflows parked awaiting a decision survive restarts: the pending
//! correlation registry is rebuilt from the store at startup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use atlas_gateway::audit::JsonlAuditLog;
use atlas_gateway::config::GlobalConfig;
use atlas_gateway::engine::{sweeper, GovernanceEngine};
use atlas_gateway::evaluator::HttpRiskEvaluator;
use atlas_gateway::gateway::InterceptionFacade;
use atlas_gateway::http::{self, AppState};
use atlas_gateway::persistence::db;
use atlas_gateway::router::DecisionRouter;
use atlas_gateway::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "atlas-gateway", about = "Governance gateway server", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the configured HTTP port.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("atlas-gateway server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    config.load_credentials().await;
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Initialize store and audit log ──────────────────
    let database = Arc::new(db::connect(&config.db_path()).await?);
    info!("workflow store connected");

    let audit = Arc::new(JsonlAuditLog::new(config.audit_dir())?);
    info!("audit log ready");

    // ── Build engine, router, façade ────────────────────
    let evaluator = Arc::new(HttpRiskEvaluator::new(&config)?);
    let engine = Arc::new(GovernanceEngine::new(
        Arc::clone(&database),
        audit,
        evaluator,
        &config,
    ));
    let router = DecisionRouter::new(Arc::clone(&engine), &config);
    let facade = InterceptionFacade::new(Arc::clone(&engine));

    // ── Rebuild pending registry from the store ─────────
    report_recovered_pending(&engine).await;

    // ── Start expiry sweep ──────────────────────────────
    let ct = CancellationToken::new();
    let sweep_handle =
        sweeper::spawn_expiry_task(Arc::clone(&engine), config.sweep_interval(), ct.clone());
    info!("expiry sweep started");

    // ── Start HTTP surface ──────────────────────────────
    let state = Arc::new(AppState {
        facade,
        router,
        engine: Arc::clone(&engine),
        api_token: config.api_token.clone(),
    });

    let http_ct = ct.clone();
    let http_port = config.http_port;
    let http_handle = tokio::spawn(async move {
        if let Err(err) = http::serve(state, http_port, http_ct).await {
            error!(%err, "http surface failed");
        }
    });

    info!("gateway ready");

    // ── Wait for shutdown signal ────────────────────────
    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    // ── Wait for background tasks ───────────────────────
    let _ = tokio::join!(http_handle, sweep_handle);

    // Parked workflows are left in the store untouched: they resume
    // correlating the moment the next process rebuilds the registry.
    match engine.pending_count().await {
        Ok(count) => info!(pending = count, "atlas-gateway shut down"),
        Err(err) => error!(%err, "failed to count pending workflows at shutdown"),
    }

    Ok(())
}

/// Report workflows found parked awaiting a decision at startup.
///
/// The store is authoritative; this is purely informational. Any decision
/// arriving for these references correlates exactly as it would have
/// before the restart.
async fn report_recovered_pending(engine: &Arc<GovernanceEngine>) {
    match engine.pending_count().await {
        Ok(0) => info!("no pending authorizations found on startup"),
        Ok(count) => info!(
            count,
            "pending authorizations recovered; correlation registry rebuilt from store"
        ),
        Err(err) => error!(%err, "failed to scan pending authorizations on startup"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
