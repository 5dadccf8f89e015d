//! revdist-action - Review session distribution action
//!
//! Listens for action events forwarded from the review system's event hub,
//! and distributes review session files through the transfer system.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use revdist_action::handlers::LaunchHandler;
use revdist_action::harvest::MountPathAccessor;
use revdist_action::orchestrator::DistributionOrchestrator;
use revdist_action::plan::{SourceParty, TransferPlanBuilder};
use revdist_action::review::ReviewApiConnector;
use revdist_action::transfer::TransferApiConnector;
use revdist_action::{build_router, AppState};
use revdist_common::config::{resolve_config_path, TomlConfig};
use tokio::signal;
use tracing::info;

/// Command-line arguments for revdist-action
#[derive(Parser, Debug)]
#[command(name = "revdist-action")]
#[command(about = "Distributes review session files to invitees through the transfer system")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "REVDIST_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref())?;
    let config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .init();

    info!(
        "Starting revdist-action v{}, configuration {}",
        env!("CARGO_PKG_VERSION"),
        config_path.display()
    );

    let source_party = SourceParty::from_client_id(config.source_client_id());
    match &source_party {
        SourceParty::LocalClient(id) => info!("Files are served by transfer client {}", id),
        SourceParty::Server => info!("No source client configured, paths are server-side"),
    }

    let excluded: HashSet<String> = config.excluded_locations.iter().cloned().collect();
    info!(
        mounts = config.locations.len(),
        excluded = excluded.len(),
        "Location configuration loaded"
    );

    let review_connector = Arc::new(ReviewApiConnector::new(config.review.clone()));
    let orchestrator = Arc::new(DistributionOrchestrator::new(
        review_connector.clone(),
        Arc::new(TransferApiConnector::new(config.transfer.clone())),
        Arc::new(MountPathAccessor::new(config.location_mounts())),
        Arc::new(excluded),
        TransferPlanBuilder::new(source_party),
    ));
    let launcher = Arc::new(LaunchHandler::new(review_connector, orchestrator));

    let app = build_router(AppState::new(launcher));

    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("revdist-action listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
