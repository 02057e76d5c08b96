//! sensor.rs — the simulated distance sensor.
//!
//! [`DistanceCell`] holds the last measurement: written by the measurement
//! loop (single producer), read by the router and any test harness. A plain
//! mutex is enough here — with exactly one writer there is no fairness
//! question.
//!
//! The measurement loop queries the target's position at `freq_hz`, adds
//! uniform noise within ±`accuracy_m`, publishes the distance, and sleeps
//! whatever is left of the tick. A transport error from the target is
//! terminal: the loop stops and the node keeps serving its last value until
//! the process is restarted.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand_distr::{Distribution, Uniform};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use mlat_types::{GetPositionRequest, GetPositionResponse, Vec3};

/// Last measured distance in meters; `+∞` until the first measurement.
pub struct DistanceCell {
    distance: Mutex<f64>,
}

impl DistanceCell {
    pub fn new() -> Self {
        Self {
            distance: Mutex::new(f64::INFINITY),
        }
    }

    pub fn get(&self) -> f64 {
        *self.distance.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set(&self, new_distance: f64) {
        *self.distance.lock().unwrap_or_else(|e| e.into_inner()) = new_distance;
    }
}

impl Default for DistanceCell {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct SensorConfig {
    pub node_id: i32,
    /// Fixed sensor position in the shared world frame
    pub position: Vec3,
    /// Base URL of the target's RPC server
    pub target_url: String,
    /// Half-width of the uniform measurement noise, meters
    pub accuracy_m: f64,
    /// Measurement frequency, Hz
    pub freq_hz: f64,
}

/// One noisy measurement: Euclidean distance plus Uniform(−acc, +acc).
fn measure(position: &Vec3, target: &Vec3, accuracy_m: f64) -> f64 {
    let noise = Uniform::new_inclusive(-accuracy_m, accuracy_m).sample(&mut rand::thread_rng());
    position.dist(target) + noise
}

pub fn spawn_updater(
    cell: Arc<DistanceCell>,
    config: SensorConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let interval = Duration::from_secs_f64(1.0 / config.freq_hz);
        let url = format!("{}/position", config.target_url);
        info!(
            "sensor {}: measuring at {} Hz (±{} m)",
            config.node_id, config.freq_hz, config.accuracy_m
        );

        loop {
            let tick_started = Instant::now();

            let response = client
                .post(&url)
                .json(&GetPositionRequest {
                    node_id: config.node_id,
                })
                .send()
                .await;
            let body: GetPositionResponse = match response {
                Ok(r) => match r.json().await {
                    Ok(body) => body,
                    Err(e) => {
                        error!(
                            "sensor {}: malformed response from the target, stopping: {e}",
                            config.node_id
                        );
                        break;
                    }
                },
                Err(e) => {
                    error!(
                        "sensor {}: transport error talking to the target, stopping: {e}",
                        config.node_id
                    );
                    break;
                }
            };

            let target_pos = Vec3::new(body.x, body.y, body.z);
            let distance = measure(&config.position, &target_pos, config.accuracy_m);
            cell.set(distance);
            debug!("sensor {}: measured {distance:.3} m", config.node_id);

            // Sleep whatever is left of the tick; skip if the tick overran.
            let elapsed = tick_started.elapsed();
            if let Some(remaining) = interval.checked_sub(elapsed) {
                tokio::select! {
                    _ = tokio::time::sleep(remaining) => {}
                    _ = shutdown.changed() => break,
                }
            } else if *shutdown.borrow() {
                break;
            }
        }
        info!("sensor {}: stopped", config.node_id);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_starts_unmeasured() {
        let cell = DistanceCell::new();
        assert!(cell.get().is_infinite());
        cell.set(4.7);
        assert_eq!(cell.get(), 4.7);
    }

    #[test]
    fn noise_stays_within_the_accuracy_band() {
        let sensor = Vec3::new(0.0, 0.0, 0.0);
        let target = Vec3::new(3.0, 4.0, 0.0);
        for _ in 0..1000 {
            let d = measure(&sensor, &target, 0.003);
            assert!((d - 5.0).abs() <= 0.003 + 1e-12, "measured {d}");
        }
    }
}
