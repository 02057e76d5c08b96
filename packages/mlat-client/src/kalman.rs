//! kalman.rs — constant-velocity Kalman filter over 3D position fixes.
//!
//! State vector `x = [x, y, z, vx, vy, vz]`. The dynamics assume zero
//! acceleration as the nominal case; unknown acceleration is folded into
//! the process noise `Q`, rebuilt together with `F` from the measured `Δt`
//! before every step. Measurements are position-only, `H` picks the first
//! three components.

use nalgebra::{Matrix3, Matrix3x6, Matrix6, Vector3, Vector6};
use tracing::warn;

use mlat_types::Vec3;

/// Sensor measurement variance: the fused fixes are good to about ±40 mm.
const MEASUREMENT_VARIANCE: f64 = 0.0016;
/// Acceleration noise per axis (process model slack).
const ACCEL_NOISE: f64 = 2.0;
/// Initial velocity variance: the first fix says nothing about velocity.
const INITIAL_VELOCITY_VARIANCE: f64 = 100.0;

pub struct KalmanFilter {
    /// State [x, y, z, vx, vy, vz]
    x: Vector6<f64>,
    /// State covariance
    p: Matrix6<f64>,
    /// State transition, rebuilt per step from Δt
    f: Matrix6<f64>,
    /// Process covariance, rebuilt per step from Δt
    q: Matrix6<f64>,
    /// Measurement matrix: picks position out of the state
    h: Matrix3x6<f64>,
    /// Measurement covariance
    r: Matrix3<f64>,
    noise_ax: f64,
    noise_ay: f64,
    noise_az: f64,
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut p = Matrix6::identity();
        p[(3, 3)] = INITIAL_VELOCITY_VARIANCE;
        p[(4, 4)] = INITIAL_VELOCITY_VARIANCE;
        p[(5, 5)] = INITIAL_VELOCITY_VARIANCE;

        let mut h = Matrix3x6::zeros();
        h[(0, 0)] = 1.0;
        h[(1, 1)] = 1.0;
        h[(2, 2)] = 1.0;

        Self {
            x: Vector6::zeros(),
            p,
            f: Matrix6::zeros(),
            q: Matrix6::zeros(),
            h,
            r: Matrix3::identity() * MEASUREMENT_VARIANCE,
            noise_ax: ACCEL_NOISE,
            noise_ay: ACCEL_NOISE,
            noise_az: ACCEL_NOISE,
        }
    }

    /// Reseed the state: position from the measurement, velocity zero.
    pub fn set_state(&mut self, position: Vec3) {
        self.x = Vector6::new(position.x, position.y, position.z, 0.0, 0.0, 0.0);
    }

    /// Current position estimate.
    pub fn state(&self) -> Vec3 {
        Vec3::new(self.x[0], self.x[1], self.x[2])
    }

    /// Current velocity estimate.
    pub fn velocity(&self) -> Vec3 {
        Vec3::new(self.x[3], self.x[4], self.x[5])
    }

    /// Rebuild `F` and `Q` for the elapsed time since the last step.
    pub fn update_matrices(&mut self, dt: f64) {
        let dt_2 = dt * dt;
        let dt_3 = dt_2 * dt;
        let dt_4 = dt_3 * dt;

        let mut q = Matrix6::zeros();
        q[(0, 0)] = dt_4 / 4.0 * self.noise_ax;
        q[(1, 1)] = dt_4 / 4.0 * self.noise_ay;
        q[(2, 2)] = dt_4 / 4.0 * self.noise_az;
        q[(0, 3)] = dt_3 / 2.0 * self.noise_ax;
        q[(1, 4)] = dt_3 / 2.0 * self.noise_ay;
        q[(2, 5)] = dt_3 / 2.0 * self.noise_az;
        q[(3, 0)] = dt_3 / 2.0 * self.noise_ax;
        q[(4, 1)] = dt_3 / 2.0 * self.noise_ay;
        q[(5, 2)] = dt_3 / 2.0 * self.noise_az;
        q[(3, 3)] = dt_2 * self.noise_ax;
        q[(4, 4)] = dt_2 * self.noise_ay;
        q[(5, 5)] = dt_2 * self.noise_az;
        self.q = q;

        let mut f = Matrix6::identity();
        f[(0, 3)] = dt;
        f[(1, 4)] = dt;
        f[(2, 5)] = dt;
        self.f = f;
    }

    /// State and covariance extrapolation.
    pub fn predict(&mut self) {
        self.x = self.f * self.x;
        self.p = self.f * self.p * self.f.transpose() + self.q;
    }

    /// Correct the prediction with a position measurement.
    pub fn update(&mut self, measurement: Vec3) {
        let z = Vector3::new(measurement.x, measurement.y, measurement.z);

        // Innovation and its covariance
        let y = z - self.h * self.x;
        let s = self.h * self.p * self.h.transpose() + self.r;
        let Some(s_inv) = s.try_inverse() else {
            // S = HPHᵀ + R with R positive definite; this cannot happen for
            // finite states, but a non-finite fix must not poison the filter.
            warn!("innovation covariance not invertible, skipping update");
            return;
        };

        let k = self.p * self.h.transpose() * s_inv;
        self.x += k * y;
        self.p = (Matrix6::identity() - k * self.h) * self.p;
    }
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}
