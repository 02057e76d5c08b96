//! estimator.rs — warm-started multilateration solver.
//!
//! Given the fixed sensor roster and one round of measured distances, finds
//! the point minimizing Σ (‖p − sᵢ‖ − dᵢ)² by Levenberg–Marquardt on the
//! normal equations. The solution is kept as the initial guess of the next
//! round: successive fixes of a moving target are close in time and space,
//! so the solver usually converges in a handful of iterations.
//!
//! The solver is non-reentrant by contract — one estimate at a time, owned
//! by the controller's round lock.

use std::collections::HashMap;

use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use mlat_types::Vec3;

use crate::state::NodeDescriptor;

const MAX_ITERATIONS: usize = 100;
/// Stop once the accepted step is below this (meters).
const STEP_TOLERANCE: f64 = 1e-10;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;

pub struct Multilateration {
    sensor_positions: Vec<(i32, Vector3<f64>)>,
    initial_guess: Vector3<f64>,
}

impl Multilateration {
    pub fn new() -> Self {
        Self {
            sensor_positions: Vec::new(),
            initial_guess: Vector3::zeros(),
        }
    }

    /// Install the sensor roster. Called once, from the `StartNetwork`
    /// snapshot.
    pub fn set_sensor_positions(&mut self, roster: &[NodeDescriptor]) {
        self.sensor_positions = roster
            .iter()
            .map(|n| {
                (
                    n.node_id,
                    Vector3::new(n.position.x, n.position.y, n.position.z),
                )
            })
            .collect();
    }

    /// Estimate the target position from one round of distances.
    ///
    /// Only sensors present in both the roster and the distance map
    /// contribute; extras on either side are ignored. With fewer than three
    /// contributors the problem is under-determined and the returned
    /// minimizer is expected to be poor — admitting enough sensors is the
    /// caller's job. The optimizer's best iterate is always returned; no
    /// convergence failure is surfaced.
    pub fn estimate_position(&mut self, distances: &HashMap<i32, f64>) -> Vec3 {
        let participating: Vec<(Vector3<f64>, f64)> = self
            .sensor_positions
            .iter()
            .filter_map(|(id, pos)| distances.get(id).map(|d| (*pos, *d)))
            .collect();

        if !participating.is_empty() {
            self.initial_guess = solve(self.initial_guess, &participating);
        }

        debug!(
            "estimated target position ({:.3}, {:.3}, {:.3}) from {} sensors",
            self.initial_guess.x,
            self.initial_guess.y,
            self.initial_guess.z,
            participating.len()
        );
        Vec3::new(
            self.initial_guess.x,
            self.initial_guess.y,
            self.initial_guess.z,
        )
    }
}

impl Default for Multilateration {
    fn default() -> Self {
        Self::new()
    }
}

fn cost(p: &Vector3<f64>, sensors: &[(Vector3<f64>, f64)]) -> f64 {
    sensors
        .iter()
        .map(|(s, d)| {
            let r = (p - s).norm() - d;
            r * r
        })
        .sum()
}

/// Levenberg–Marquardt with a scalar damping term: solve
/// (JᵀJ + λI) δ = −Jᵀr and adapt λ on acceptance/rejection.
fn solve(start: Vector3<f64>, sensors: &[(Vector3<f64>, f64)]) -> Vector3<f64> {
    let mut p = start;
    let mut current_cost = cost(&p, sensors);
    let mut lambda = LAMBDA_INIT;

    for _ in 0..MAX_ITERATIONS {
        let mut jtj = Matrix3::zeros();
        let mut jtr = Vector3::zeros();
        for (s, d) in sensors {
            let delta = p - s;
            let dist = delta.norm().max(1e-9);
            let residual = dist - d;
            // ∂r/∂p = (p − s) / ‖p − s‖
            let j = delta / dist;
            jtj += j * j.transpose();
            jtr += j * residual;
        }

        let damped = jtj + Matrix3::identity() * lambda;
        let Some(step) = damped.lu().solve(&(-jtr)) else {
            lambda = (lambda * 10.0).min(LAMBDA_MAX);
            continue;
        };

        if step.norm() < STEP_TOLERANCE {
            break;
        }

        let candidate = p + step;
        let candidate_cost = cost(&candidate, sensors);
        if candidate_cost < current_cost {
            p = candidate;
            current_cost = candidate_cost;
            lambda = (lambda / 10.0).max(LAMBDA_MIN);
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                break;
            }
        }
    }

    p
}
