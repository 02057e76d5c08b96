//! handlers.rs — the controller's RPC surface and lifecycle state machine.
//!
//! Three unary methods over the shared state:
//!
//! | RPC                       | precondition          | effect                     |
//! |---------------------------|-----------------------|----------------------------|
//! | `AddNode`                 | inactive, id unknown  | insert descriptor          |
//! | `StartNetwork`            | inactive              | snapshot roster, go active |
//! | `GetTargetGlobalPosition` | active                | fan-out + multilateration  |
//!
//! The only lifecycle transition is inactive → active; there is no stop or
//! restart edge.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use mlat_types::{
    AddNodeRequest, AddNodeResponse, NodeStatus, StartNetworkRequest, StartNetworkResponse,
    StartStatus, TargetPositionRequest, TargetPositionResponse, TargetStatus,
};

use crate::dealer::NetworkDealer;
use crate::estimator::Multilateration;
use crate::state::{NodeDescriptor, NodeRegistry};

/// Dealer + estimator for one fusion round. Both are stateful across rounds
/// (socket connections, warm start) and non-reentrant, so they live behind
/// one async mutex: one round at a time, and competing `StartNetwork` calls
/// serialize through the same lock.
struct FusionRound {
    dealer: NetworkDealer,
    estimator: Multilateration,
}

pub struct ControllerState {
    pub registry: NodeRegistry,
    round: Mutex<FusionRound>,
}

pub type SharedController = Arc<ControllerState>;

impl ControllerState {
    pub fn new() -> Self {
        Self {
            registry: NodeRegistry::new(),
            round: Mutex::new(FusionRound {
                dealer: NetworkDealer::new(),
                estimator: Multilateration::new(),
            }),
        }
    }

    /// Controller with a shortened dealer deadline, for tests.
    pub fn with_dealer_deadline(recv_deadline: Duration) -> Self {
        Self {
            registry: NodeRegistry::new(),
            round: Mutex::new(FusionRound {
                dealer: NetworkDealer::with_deadline(recv_deadline),
                estimator: Multilateration::new(),
            }),
        }
    }

    pub async fn admit_node(&self, req: AddNodeRequest) -> AddNodeResponse {
        info!("AddNode request from node {}", req.node_id);

        if self.registry.is_active() {
            warn!(
                "rejecting node {}: the network is already active",
                req.node_id
            );
            return AddNodeResponse {
                status: NodeStatus::Error,
            };
        }

        let added = self.registry.add_node(NodeDescriptor {
            node_id: req.node_id,
            position: req.position,
            reply_address: req.reply_address,
        });

        if added {
            info!("node {} admitted to the network", req.node_id);
            AddNodeResponse {
                status: NodeStatus::Ok,
            }
        } else {
            warn!("rejecting node {}: id already present", req.node_id);
            AddNodeResponse {
                status: NodeStatus::Error,
            }
        }
    }

    pub async fn activate_network(&self, req: StartNetworkRequest) -> StartNetworkResponse {
        info!("StartNetwork request from client {}", req.client_id);

        // Serialize competing starters; the winner re-checks the flag under
        // the round lock so exactly one caller sees SS_OK.
        let mut round = self.round.lock().await;
        if self.registry.is_active() {
            warn!("cannot start the network: already active");
            return StartNetworkResponse {
                status: StartStatus::Error,
                n_nodes: 0,
            };
        }

        let roster = self.registry.nodes_snapshot();
        let n_nodes = roster.len() as u32;

        if let Err(e) = round.dealer.connect(&roster).await {
            error!("dealer socket setup failed: {e}");
            return StartNetworkResponse {
                status: StartStatus::Error,
                n_nodes: 0,
            };
        }
        round.estimator.set_sensor_positions(&roster);
        self.registry.activate();

        info!("network started with {n_nodes} nodes");
        StartNetworkResponse {
            status: StartStatus::Ok,
            n_nodes,
        }
    }

    pub async fn fuse_target_position(&self, req: TargetPositionRequest) -> TargetPositionResponse {
        if !self.registry.is_active() {
            warn!(
                "client {} asked for the target position before the network was started",
                req.client_id
            );
            return TargetPositionResponse {
                status: TargetStatus::Error,
                x: f64::INFINITY,
                y: f64::INFINITY,
                z: f64::INFINITY,
            };
        }

        let mut round = self.round.lock().await;
        let distances = round.dealer.request_distances().await;
        let position = round.estimator.estimate_position(&distances);

        TargetPositionResponse {
            status: TargetStatus::Ok,
            x: position.x,
            y: position.y,
            z: position.z,
        }
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new()
    }
}

// ── Axum wrappers ─────────────────────────────────────────────────────────────

pub async fn add_node(
    State(ctrl): State<SharedController>,
    Json(req): Json<AddNodeRequest>,
) -> Json<AddNodeResponse> {
    Json(ctrl.admit_node(req).await)
}

pub async fn start_network(
    State(ctrl): State<SharedController>,
    Json(req): Json<StartNetworkRequest>,
) -> Json<StartNetworkResponse> {
    Json(ctrl.activate_network(req).await)
}

pub async fn target_global_position(
    State(ctrl): State<SharedController>,
    Json(req): Json<TargetPositionRequest>,
) -> Json<TargetPositionResponse> {
    Json(ctrl.fuse_target_position(req).await)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
