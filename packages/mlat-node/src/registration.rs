//! registration.rs — one-shot admission of this node into the network.

use anyhow::Context;
use tracing::{info, warn};

use mlat_types::{AddNodeRequest, AddNodeResponse, NodeStatus, Vec3};

/// Ask the controller to admit this node. Returns whether the node was
/// accepted; transport failures bubble up as errors (unrecoverable at
/// startup).
pub async fn register_with_network(
    client: &reqwest::Client,
    network_url: &str,
    node_id: i32,
    position: Vec3,
    reply_address: String,
) -> anyhow::Result<bool> {
    let request = AddNodeRequest {
        node_id,
        position,
        reply_address,
    };

    let response: AddNodeResponse = client
        .post(format!("{network_url}/add-node"))
        .json(&request)
        .send()
        .await
        .context("transport error talking to the network controller")?
        .json()
        .await
        .context("malformed admission response from the network controller")?;

    match response.status {
        NodeStatus::Ok => {
            info!("node {node_id}: admitted to the network");
            Ok(true)
        }
        _ => {
            warn!("node {node_id}: not admitted to the network");
            Ok(false)
        }
    }
}
