//! router.rs — serves the dealer's distance requests.
//!
//! Binds the node's datagram endpoint and answers each inbound frame
//! independently: `"GetDistance"` gets the last value in the node's
//! [`DistanceCell`], anything else gets the literal `"Error"`. Replies go
//! back to whichever peer sent the request; the router never assumes a
//! single requester.

use std::io;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use mlat_types::wire;

use crate::sensor::DistanceCell;

pub struct NodeRouter {
    socket: UdpSocket,
    node_id: i32,
    cell: Arc<DistanceCell>,
}

impl NodeRouter {
    pub async fn bind(node_id: i32, bind_address: &str, cell: Arc<DistanceCell>) -> io::Result<Self> {
        let socket = UdpSocket::bind(bind_address).await?;
        info!("router {node_id}: listening on {bind_address} for requests");
        Ok(Self {
            socket,
            node_id,
            cell,
        })
    }

    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buf = [0u8; 128];
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    received = self.socket.recv_from(&mut buf) => {
                        let (len, from) = match received {
                            Ok(r) => r,
                            Err(e) => {
                                warn!("router {}: receive error: {e}", self.node_id);
                                continue;
                            }
                        };
                        let body = String::from_utf8_lossy(&buf[..len]);
                        let reply = if body == wire::GET_DISTANCE {
                            let distance = self.cell.get();
                            debug!("router {}: sending distance {distance:.3} m", self.node_id);
                            wire::format_distance_reply(self.node_id, distance)
                        } else {
                            warn!("router {}: unknown request {body:?}", self.node_id);
                            wire::ERROR_REPLY.to_string()
                        };
                        if let Err(e) = self.socket.send_to(reply.as_bytes(), from).await {
                            warn!("router {}: reply to {from} failed: {e}", self.node_id);
                        }
                    }
                }
            }
            info!("router {}: stopped", self.node_id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn start_router(node_id: i32, distance: f64) -> (std::net::SocketAddr, watch::Sender<bool>) {
        let cell = Arc::new(DistanceCell::new());
        cell.set(distance);
        let router = NodeRouter::bind(node_id, "127.0.0.1:0", cell).await.unwrap();
        let addr = router.socket.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        router.spawn(rx);
        (addr, tx)
    }

    #[tokio::test]
    async fn answers_distance_requests() {
        let (addr, _shutdown) = start_router(3, 6.5).await;

        let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        probe
            .send_to(wire::GET_DISTANCE.as_bytes(), addr)
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = probe.recv_from(&mut buf).await.unwrap();
        let body = String::from_utf8_lossy(&buf[..len]).to_string();
        assert_eq!(wire::parse_distance_reply(&body), Some((3, 6.5)));
    }

    #[tokio::test]
    async fn unknown_requests_get_the_error_reply() {
        let (addr, _shutdown) = start_router(1, 2.0).await;

        let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        probe.send_to(b"GetTemperature", addr).await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = probe.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], wire::ERROR_REPLY.as_bytes());
    }

    #[tokio::test]
    async fn serves_interleaved_peers_independently() {
        let (addr, _shutdown) = start_router(7, 1.25).await;

        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        a.send_to(wire::GET_DISTANCE.as_bytes(), addr).await.unwrap();
        b.send_to(wire::GET_DISTANCE.as_bytes(), addr).await.unwrap();

        let mut buf = [0u8; 64];
        for probe in [&a, &b] {
            let (len, _) = probe.recv_from(&mut buf).await.unwrap();
            let body = String::from_utf8_lossy(&buf[..len]).to_string();
            assert_eq!(wire::parse_distance_reply(&body), Some((7, 1.25)));
        }
    }
}
