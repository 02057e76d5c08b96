//! service.rs — the target's RPC surface: one unary `GetPosition` method
//! plus a health probe.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::json;
use tracing::debug;

use mlat_types::{GetPositionRequest, GetPositionResponse, PositionStatus};

use crate::state::TargetPoint;

pub type SharedTarget = Arc<TargetPoint>;

pub async fn get_position(
    State(target): State<SharedTarget>,
    Json(req): Json<GetPositionRequest>,
) -> Json<GetPositionResponse> {
    let position = target.position();
    debug!(
        "GetPosition from node {} → ({:.3}, {:.3}, {:.3})",
        req.node_id, position.x, position.y, position.z
    );
    Json(GetPositionResponse {
        status: PositionStatus::Ok,
        x: position.x,
        y: position.y,
        z: position.z,
    })
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlat_types::Vec3;

    #[tokio::test]
    async fn reports_the_current_position() {
        let target: SharedTarget = Arc::new(TargetPoint::new(Vec3::new(5.0, 2.5, 1.2)));
        let Json(res) = get_position(
            State(target.clone()),
            Json(GetPositionRequest { node_id: 1 }),
        )
        .await;
        assert_eq!(res.status, PositionStatus::Ok);
        assert_eq!((res.x, res.y, res.z), (5.0, 2.5, 1.2));

        target.set_position(Vec3::new(4.9, 2.6, 1.2));
        let Json(res) = get_position(State(target), Json(GetPositionRequest { node_id: 2 })).await;
        assert_eq!((res.x, res.y, res.z), (4.9, 2.6, 1.2));
    }
}
