mod service;
mod state;
mod trajectory;
mod updater;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use mlat_types::Vec3;
use state::TargetPoint;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mlat-target", about = "Moving target process")]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    verbose: bool,
    /// Trajectory file: JSON array of {x, y, z} waypoints
    #[arg(long, default_value = "data/circular_path.json")]
    path: String,
    /// Waypoint update frequency in Hz
    #[arg(long, default_value_t = 3.0)]
    freq: f64,
    /// Walk the trajectory once instead of looping it
    #[arg(long)]
    no_loop: bool,
    /// Address the RPC server listens on
    #[arg(long, default_value = "127.0.0.1:50051")]
    listen: String,
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "mlat_target=debug"
    } else {
        "mlat_target=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    // Fatal configuration error if the file is missing, malformed or empty.
    let waypoints = trajectory::load_waypoints(&args.path)
        .with_context(|| format!("cannot start without a trajectory ({})", args.path))?;
    info!(
        "🎯 Target starting with {} waypoints from {}",
        waypoints.len(),
        args.path
    );

    let target: service::SharedTarget = Arc::new(TargetPoint::new(Vec3::zero()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let updater = updater::spawn_updater(
        target.clone(),
        waypoints,
        args.freq,
        !args.no_loop,
        shutdown_rx,
    );

    let app = Router::new()
        .route("/health", get(service::health))
        .route("/position", post(service::get_position))
        .with_state(target);

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!("🚀 Listening on {}", args.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await
        .context("RPC server terminated")?;

    // Stop and join the updater so teardown is deterministic.
    let _ = shutdown_tx.send(true);
    let _ = updater.await;
    info!("target stopped");
    Ok(())
}
