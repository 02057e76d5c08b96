//! app.rs — the tracking client.
//!
//! Starts the network, then polls `GetTargetGlobalPosition` at the
//! configured frequency, smoothing each fix through the tracker and
//! appending one CSV row per poll. The loop ends on `TS_ERROR`, on a
//! transport failure, or on cancellation.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use mlat_types::{
    StartNetworkRequest, StartNetworkResponse, StartStatus, TargetPositionRequest,
    TargetPositionResponse, TargetStatus, Vec3,
};

use crate::tracker::Tracker;

const CSV_HEADER: &str = "X;Y;Z";

pub struct ClientConfig {
    pub client_id: i32,
    /// Base URL of the network controller
    pub network_url: String,
    /// Poll frequency, Hz (10–30 Hz recommended; higher for fast targets)
    pub freq_hz: f64,
    /// Output CSV for the smoothed trajectory
    pub output_path: PathBuf,
}

pub struct ClientApp {
    config: ClientConfig,
    tracker: Tracker,
    http: reqwest::Client,
}

impl ClientApp {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            tracker: Tracker::new(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        if !self.start_network().await? {
            bail!("the network controller refused to start the network");
        }
        self.track_target(&mut shutdown).await
    }

    async fn start_network(&self) -> anyhow::Result<bool> {
        let response: StartNetworkResponse = self
            .http
            .post(format!("{}/start-network", self.config.network_url))
            .json(&StartNetworkRequest {
                client_id: self.config.client_id,
            })
            .send()
            .await
            .context("transport error talking to the network controller")?
            .json()
            .await
            .context("malformed StartNetwork response")?;

        if response.status == StartStatus::Ok {
            info!("network started with {} nodes", response.n_nodes);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn track_target(&mut self, shutdown: &mut watch::Receiver<bool>) -> anyhow::Result<()> {
        if let Some(parent) = self.config.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create output directory {parent:?}"))?;
            }
        }
        let mut file = File::create(&self.config.output_path)
            .with_context(|| format!("cannot open {:?}", self.config.output_path))?;
        writeln!(file, "{CSV_HEADER}")?;
        info!(
            "tracking at {} Hz, writing {:?}",
            self.config.freq_hz, self.config.output_path
        );

        let interval = Duration::from_secs_f64(1.0 / self.config.freq_hz);
        let url = format!("{}/target-global-position", self.config.network_url);

        loop {
            let response: TargetPositionResponse = self
                .http
                .post(&url)
                .json(&TargetPositionRequest {
                    client_id: self.config.client_id,
                })
                .send()
                .await
                .context("transport error talking to the network controller")?
                .json()
                .await
                .context("malformed position response")?;

            if response.status == TargetStatus::Error {
                warn!("the network is not active, stopping the tracking loop");
                break;
            }

            let fix = Vec3::new(response.x, response.y, response.z);
            let smoothed = self.tracker.track(fix);
            debug!("predicted position {}", format_row(smoothed));
            writeln!(file, "{}", format_row(smoothed))?;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {
                    info!("tracking interrupted, closing output");
                    break;
                }
            }
        }
        Ok(())
    }
}

fn format_row(position: Vec3) -> String {
    format!("{:.3};{:.3};{:.3}", position.x, position.y, position.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_use_semicolons_and_three_decimals() {
        assert_eq!(format_row(Vec3::new(1.0, 2.5, -0.125)), "1.000;2.500;-0.125");
        assert_eq!(
            format_row(Vec3::new(1.23456, 0.0004, 10.0)),
            "1.235;0.000;10.000"
        );
        assert_eq!(CSV_HEADER, "X;Y;Z");
    }
}
