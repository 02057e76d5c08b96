//! dealer.rs — one-shot scatter/gather over the node routers.
//!
//! A single datagram socket fans the `"GetDistance"` request out to every
//! node in the roster snapshot, then collects replies until the roster is
//! covered or 5 s pass without a successful receive. Missing or malformed
//! replies simply leave holes in the returned map; the solver treats absent
//! nodes as not participating in the round.
//!
//! The dealer is single-threaded per round and owned by the controller's
//! round lock.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use mlat_types::wire;

use crate::state::NodeDescriptor;

/// How long one round waits since the last successful receive.
const RECV_DEADLINE: Duration = Duration::from_secs(5);

pub struct NetworkDealer {
    socket: Option<UdpSocket>,
    peers: Vec<SocketAddr>,
    recv_deadline: Duration,
}

impl NetworkDealer {
    pub fn new() -> Self {
        Self {
            socket: None,
            peers: Vec::new(),
            recv_deadline: RECV_DEADLINE,
        }
    }

    /// Same dealer with a shorter round deadline; test harnesses use this so
    /// partial-failure rounds do not wait the full 5 s.
    pub fn with_deadline(recv_deadline: Duration) -> Self {
        Self {
            socket: None,
            peers: Vec::new(),
            recv_deadline,
        }
    }

    /// Bind the round socket and resolve every node's reply address from the
    /// roster snapshot. A node announcing an unparseable address is dropped
    /// from the round with a warning; it could never reply anyway.
    pub async fn connect(&mut self, roster: &[NodeDescriptor]) -> io::Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        self.peers.clear();
        for node in roster {
            match node.reply_address.parse::<SocketAddr>() {
                Ok(addr) => {
                    info!("dealer: node {} reachable at {addr}", node.node_id);
                    self.peers.push(addr);
                }
                Err(e) => {
                    warn!(
                        "dealer: dropping node {} with bad reply address {:?}: {e}",
                        node.node_id, node.reply_address
                    );
                }
            }
        }
        self.socket = Some(socket);
        Ok(())
    }

    /// Run one scatter/gather round. Returns whatever arrived in time, at
    /// most one entry per node id (duplicate replies last-write-win).
    pub async fn request_distances(&mut self) -> HashMap<i32, f64> {
        let mut distances = HashMap::new();
        let Some(socket) = &self.socket else {
            warn!("dealer: round requested before connect");
            return distances;
        };

        for peer in &self.peers {
            if let Err(e) = socket.send_to(wire::GET_DISTANCE.as_bytes(), peer).await {
                warn!("dealer: request to {peer} failed: {e}");
            }
        }

        let replies_needed = self.peers.len();
        let mut replies_collected = 0;
        let mut buf = [0u8; 256];
        while replies_collected < replies_needed {
            match timeout(self.recv_deadline, socket.recv_from(&mut buf)).await {
                Ok(Ok((len, from))) => {
                    let body = String::from_utf8_lossy(&buf[..len]);
                    match wire::parse_distance_reply(&body) {
                        Some((node_id, distance)) => {
                            debug!("dealer: node {node_id} replied {distance:.3} m");
                            distances.insert(node_id, distance);
                            replies_collected += 1;
                        }
                        None => {
                            warn!("dealer: unparseable reply from {from}: {body:?}");
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!("dealer: receive error, closing round: {e}");
                    break;
                }
                Err(_) => {
                    warn!(
                        "dealer: round timed out with {replies_collected} of {replies_needed} replies"
                    );
                    break;
                }
            }
        }

        distances
    }
}

impl Default for NetworkDealer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlat_types::Vec3;

    /// A router stand-in: answers every `"GetDistance"` with the given
    /// node id and distance, anything else with `"Error"`.
    async fn fake_router(reply_node_id: Option<i32>, distance: f64) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            while let Ok((len, from)) = socket.recv_from(&mut buf).await {
                let body = match reply_node_id {
                    Some(id) if &buf[..len] == wire::GET_DISTANCE.as_bytes() => {
                        wire::format_distance_reply(id, distance)
                    }
                    _ => wire::ERROR_REPLY.to_string(),
                };
                let _ = socket.send_to(body.as_bytes(), from).await;
            }
        });
        addr
    }

    fn descriptor(node_id: i32, addr: SocketAddr) -> NodeDescriptor {
        NodeDescriptor {
            node_id,
            position: Vec3::zero(),
            reply_address: addr.to_string(),
        }
    }

    #[tokio::test]
    async fn collects_one_entry_per_node() {
        let a = fake_router(Some(1), 5.0).await;
        let b = fake_router(Some(2), 8.0623).await;
        let c = fake_router(Some(3), 6.7082).await;

        let mut dealer = NetworkDealer::with_deadline(Duration::from_millis(500));
        dealer
            .connect(&[descriptor(1, a), descriptor(2, b), descriptor(3, c)])
            .await
            .unwrap();

        let distances = dealer.request_distances().await;
        assert_eq!(distances.len(), 3);
        assert_eq!(distances[&1], 5.0);
        assert_eq!(distances[&2], 8.0623);
        assert_eq!(distances[&3], 6.7082);
    }

    #[tokio::test]
    async fn duplicate_node_ids_last_write_win() {
        // Two routers claiming the same node id: the round still terminates
        // (two replies for two requests) and the map holds a single entry.
        let a = fake_router(Some(7), 1.0).await;
        let b = fake_router(Some(7), 2.0).await;

        let mut dealer = NetworkDealer::with_deadline(Duration::from_millis(500));
        dealer
            .connect(&[descriptor(7, a), descriptor(8, b)])
            .await
            .unwrap();

        let distances = dealer.request_distances().await;
        assert_eq!(distances.len(), 1);
        assert!(distances[&7] == 1.0 || distances[&7] == 2.0);
    }

    #[tokio::test]
    async fn timeout_returns_partial_map() {
        let a = fake_router(Some(1), 5.0).await;
        // Node 2's router is dead: a bound socket nobody reads from.
        let dead = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = dead.local_addr().unwrap();

        let mut dealer = NetworkDealer::with_deadline(Duration::from_millis(200));
        dealer
            .connect(&[descriptor(1, a), descriptor(2, dead_addr)])
            .await
            .unwrap();

        let distances = dealer.request_distances().await;
        assert_eq!(distances.len(), 1);
        assert_eq!(distances[&1], 5.0);
    }

    #[tokio::test]
    async fn error_replies_do_not_poison_the_round() {
        let good = fake_router(Some(1), 3.5).await;
        let bad = fake_router(None, 0.0).await; // always replies "Error"

        let mut dealer = NetworkDealer::with_deadline(Duration::from_millis(200));
        dealer
            .connect(&[descriptor(1, good), descriptor(2, bad)])
            .await
            .unwrap();

        let distances = dealer.request_distances().await;
        assert_eq!(distances.len(), 1);
        assert_eq!(distances[&1], 3.5);
    }

    #[tokio::test]
    async fn round_before_connect_is_empty() {
        let mut dealer = NetworkDealer::with_deadline(Duration::from_millis(100));
        assert!(dealer.request_distances().await.is_empty());
    }
}
