//! tracker.rs — wraps the Kalman filter with wall-clock Δt bookkeeping.
//!
//! The first measurement reseeds the filter state (position from the fix,
//! velocity zero) and still runs a full predict+update that tick, with Δt
//! measured from tracker construction. Owned by the client loop; not shared
//! across tasks.

use std::time::Instant;

use mlat_types::Vec3;

use crate::kalman::KalmanFilter;

pub struct Tracker {
    kalman: KalmanFilter,
    initialized: bool,
    prev_time: Instant,
    last_estimate: Vec3,
}

impl Tracker {
    pub fn new() -> Self {
        let mut kalman = KalmanFilter::new();
        kalman.set_state(Vec3::zero());
        Self {
            kalman,
            initialized: false,
            prev_time: Instant::now(),
            last_estimate: Vec3::zero(),
        }
    }

    /// Feed one measured fix; returns the smoothed position.
    pub fn track(&mut self, measurement: Vec3) -> Vec3 {
        if !self.initialized {
            self.initialized = true;
            self.kalman.set_state(measurement);
        }

        let now = Instant::now();
        let dt = now.duration_since(self.prev_time).as_secs_f64();
        self.prev_time = now;

        self.kalman.update_matrices(dt);
        self.kalman.predict();
        self.kalman.update(measurement);

        self.last_estimate = self.kalman.state();
        self.last_estimate
    }

    pub fn predicted_position(&self) -> Vec3 {
        self.last_estimate
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}
