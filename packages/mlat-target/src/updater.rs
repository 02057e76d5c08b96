//! updater.rs — walks the target along its recorded trajectory.
//!
//! Runs as a spawned task publishing one waypoint per tick into the shared
//! [`TargetPoint`]. With looping enabled the path restarts from the first
//! waypoint; otherwise the task ends after one pass. Shutdown is signalled
//! through a watch channel so the process can join the task and exit
//! cleanly.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use mlat_types::Vec3;

use crate::state::TargetPoint;

pub fn spawn_updater(
    target: Arc<TargetPoint>,
    waypoints: Vec<Vec3>,
    freq_hz: f64,
    loop_path: bool,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval = Duration::from_secs_f64(1.0 / freq_hz);
        info!(
            "updater: following {} waypoints at {freq_hz} Hz (loop: {loop_path})",
            waypoints.len()
        );

        let mut index = 0;
        loop {
            let waypoint = waypoints[index];
            target.set_position(waypoint);
            debug!(
                "updater: target moved to ({:.3}, {:.3}, {:.3})",
                waypoint.x, waypoint.y, waypoint.z
            );

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => break,
            }

            index += 1;
            if index >= waypoints.len() {
                if loop_path {
                    index = 0;
                } else {
                    break;
                }
            }
        }
        info!("updater: stopped");
    })
}
