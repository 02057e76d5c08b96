//! # mlat-types
//!
//! Shared wire types for the multilateration sensor network.
//!
//! These types are used by:
//! - `network-rust`: the network controller (admission, fan-out, fusion)
//! - `packages/mlat-target`: the moving target process
//! - `packages/mlat-node`: the sensor node processes
//! - `packages/mlat-client`: the tracking client
//!
//! ## Conventions
//!
//! - All positions are 3D Cartesian, meters.
//! - Controller and target RPCs are unary JSON request/response pairs; every
//!   response carries an explicit status enum with an `UNKNOWN` sentinel.
//! - The dealer ↔ router hop is a plain ASCII datagram protocol
//!   (`"GetDistance"` / `"<node_id>:<distance>"`), see [`wire`].
//! - Non-finite coordinates cross the JSON boundary as `null` and come back
//!   as `+∞`, see [`nullable_inf`].

use serde::{Deserialize, Serialize};

pub mod sync;
pub mod wire;

// ── 3D Vector ─────────────────────────────────────────────────────────────────

/// 3D position (meters)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    /// Euclidean distance to another point
    pub fn dist(&self, other: &Vec3) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

// ── Status codes ──────────────────────────────────────────────────────────────

/// Outcome of an `AddNode` admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeStatus {
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "NS_OK")]
    Ok,
    #[serde(rename = "NS_ERROR")]
    Error,
}

/// Outcome of a `StartNetwork` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StartStatus {
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "SS_OK")]
    Ok,
    #[serde(rename = "SS_ERROR")]
    Error,
}

/// Outcome of a `GetTargetGlobalPosition` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetStatus {
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "TS_OK")]
    Ok,
    #[serde(rename = "TS_ERROR")]
    Error,
}

/// Outcome of a `GetPosition` request to the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionStatus {
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "PS_OK")]
    Ok,
}

// ── Controller RPC messages ───────────────────────────────────────────────────

/// `AddNode` — a sensor node asks to join the network before start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNodeRequest {
    /// Node ID, unique within one controller lifetime
    pub node_id: i32,
    /// Fixed sensor position in the shared world frame
    pub position: Vec3,
    /// Datagram address where the node's router answers distance requests
    pub reply_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNodeResponse {
    pub status: NodeStatus,
}

/// `StartNetwork` — a client freezes the roster and activates the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartNetworkRequest {
    pub client_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartNetworkResponse {
    pub status: StartStatus,
    /// Size of the roster snapshot the network was started with
    #[serde(default)]
    pub n_nodes: u32,
}

/// `GetTargetGlobalPosition` — a client asks for one fused position fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPositionRequest {
    pub client_id: i32,
}

/// Fused position response. On `TS_ERROR` the coordinates are `+∞`,
/// which crosses the JSON boundary as `null` (see [`nullable_inf`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPositionResponse {
    pub status: TargetStatus,
    #[serde(with = "nullable_inf")]
    pub x: f64,
    #[serde(with = "nullable_inf")]
    pub y: f64,
    #[serde(with = "nullable_inf")]
    pub z: f64,
}

// ── Target RPC messages ───────────────────────────────────────────────────────

/// `GetPosition` — a sensor node samples the target's current position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPositionRequest {
    pub node_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPositionResponse {
    pub status: PositionStatus,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

// ── Infinity over JSON ────────────────────────────────────────────────────────

/// JSON has no representation for `f64::INFINITY`; serde_json would emit
/// `null` and then refuse to read it back into an `f64`. This helper makes
/// the mapping explicit and symmetric: non-finite serializes as `null`,
/// `null` deserializes as `+∞`.
pub mod nullable_inf {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
