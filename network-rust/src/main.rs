mod dealer;
mod estimator;
mod handlers;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tracing::info;

use handlers::{ControllerState, SharedController};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mlat-network", about = "Multilateration network controller")]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    verbose: bool,
    /// Address the RPC server listens on
    #[arg(long, default_value = "127.0.0.1:50052")]
    listen: String,
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "mlat_network=debug"
    } else {
        "mlat_network=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    info!(
        "🛰  Network controller v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let controller: SharedController = Arc::new(ControllerState::new());

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/add-node", post(handlers::add_node))
        .route("/start-network", post(handlers::start_network))
        .route("/target-global-position", post(handlers::target_global_position))
        .with_state(controller);

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!("🚀 Listening on {}", args.listen);

    axum::serve(listener, app)
        .await
        .context("RPC server terminated")?;
    Ok(())
}
