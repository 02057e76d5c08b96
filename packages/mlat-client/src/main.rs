mod app;
mod kalman;
mod tracker;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use app::{ClientApp, ClientConfig};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mlat-client", about = "Target tracking client")]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    verbose: bool,
    /// Client ID
    #[arg(long, default_value_t = 1)]
    client_id: i32,
    /// Poll frequency in Hz (10–30 Hz recommended)
    #[arg(long, default_value_t = 15.0)]
    freq: f64,
    /// Output CSV path; defaults to data/run_<YYYYMMDD_HHMMSS>.csv
    #[arg(long)]
    output: Option<PathBuf>,
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "mlat_client=debug"
    } else {
        "mlat_client=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let network_url = std::env::var("MLAT_NETWORK_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:50052".to_string());
    let output_path = args.output.unwrap_or_else(|| {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        PathBuf::from(format!("data/run_{stamp}.csv"))
    });

    info!("🛰  Tracking client {} starting", args.client_id);

    // SIGINT flips the shutdown flag; the loop sees it at its next await.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let mut app = ClientApp::new(ClientConfig {
        client_id: args.client_id,
        network_url,
        freq_hz: args.freq,
        output_path,
    });
    app.run(shutdown_rx).await.context("tracking client failed")?;
    info!("client stopped");
    Ok(())
}
