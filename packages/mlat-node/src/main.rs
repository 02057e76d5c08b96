mod registration;
mod router;
mod sensor;

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use mlat_types::Vec3;
use router::NodeRouter;
use sensor::{DistanceCell, SensorConfig};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mlat-node", about = "Distance sensor node")]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    verbose: bool,
    /// Node ID, unique within the network
    #[arg(long)]
    node_id: i32,
    /// Sensor position as three values: x y z
    #[arg(long, num_args = 3, required = true, value_names = ["X", "Y", "Z"])]
    pos: Vec<f64>,
    /// Measurement frequency in Hz
    #[arg(long, default_value_t = 40.0)]
    freq: f64,
    /// Uniform measurement noise half-width in meters
    #[arg(long, default_value_t = 0.003)]
    accuracy: f64,
}

// ── Endpoints (env-overridable) ───────────────────────────────────────────────

struct Endpoints {
    target_url: String,
    network_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            target_url: std::env::var("MLAT_TARGET_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:50051".to_string()),
            network_url: std::env::var("MLAT_NETWORK_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:50052".to_string()),
        }
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "mlat_node=debug"
    } else {
        "mlat_node=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let endpoints = Endpoints::default();
    let position = Vec3::new(args.pos[0], args.pos[1], args.pos[2]);
    // Port scheme: router of node N binds 555N.
    let bind_address = format!("0.0.0.0:555{}", args.node_id);
    let reply_address = format!("127.0.0.1:555{}", args.node_id);

    info!(
        "📡 Node {} starting at ({:.3}, {:.3}, {:.3})",
        args.node_id, position.x, position.y, position.z
    );

    let cell = Arc::new(DistanceCell::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Bind the router before registering so the dealer can reach this node
    // the moment the controller knows about it.
    let router = NodeRouter::bind(args.node_id, &bind_address, cell.clone())
        .await
        .with_context(|| format!("failed to bind router on {bind_address}"))?;

    let updater = sensor::spawn_updater(
        cell.clone(),
        SensorConfig {
            node_id: args.node_id,
            position,
            target_url: endpoints.target_url,
            accuracy_m: args.accuracy,
            freq_hz: args.freq,
        },
        shutdown_rx.clone(),
    );

    let http = reqwest::Client::new();
    let admitted = registration::register_with_network(
        &http,
        &endpoints.network_url,
        args.node_id,
        position,
        reply_address,
    )
    .await?;
    if !admitted {
        bail!(
            "node {} was rejected by the network controller (duplicate id or network already active)",
            args.node_id
        );
    }

    let router_handle = router.spawn(shutdown_rx);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);
    let _ = updater.await;
    let _ = router_handle.await;
    info!("node {} stopped", args.node_id);
    Ok(())
}
