//! UDP transport

use mavlink::common::MavMessage;
use mavlink::{MavHeader, Message};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use crate::framing::{FrameDecoder, encode_v2};
use crate::transport::{Received, Transport};
use crate::{GcsError, Result};

/// Largest UDP payload over IPv4; one datagram may carry several frames
const MAX_DATAGRAM: usize = 65_507;

/// MAVLink over UDP datagrams
///
/// In listen mode the peer is whoever sent the most recent datagram, the
/// way autopilots and SITL instances stream to a ground-station port.
pub struct UdpTransport {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
    fixed_peer: bool,
    decoder: FrameDecoder,
    recv_buf: Vec<u8>,
}

impl UdpTransport {
    /// Bind to `address` and wait for the vehicle to send first
    pub async fn listen(address: &str) -> Result<Self> {
        let socket = UdpSocket::bind(address)
            .await
            .map_err(|e| GcsError::connect_failed(format!("udpin:{address}"), e.to_string()))?;
        info!("Listening for MAVLink on udp {}", address);
        Ok(Self::with_socket(socket, None))
    }

    /// Bind an ephemeral port and send to `address`
    pub async fn send_to(address: &str) -> Result<Self> {
        let endpoint = format!("udpout:{address}");
        let peer = tokio::net::lookup_host(address)
            .await
            .map_err(|e| GcsError::connect_failed(&endpoint, e.to_string()))?
            .next()
            .ok_or_else(|| GcsError::connect_failed(&endpoint, "host did not resolve"))?;
        let bind = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind)
            .await
            .map_err(|e| GcsError::connect_failed(&endpoint, e.to_string()))?;
        info!("Sending MAVLink to udp {}", peer);
        Ok(Self::with_socket(socket, Some(peer)))
    }

    fn with_socket(socket: UdpSocket, peer: Option<SocketAddr>) -> Self {
        Self {
            socket,
            fixed_peer: peer.is_some(),
            peer,
            decoder: FrameDecoder::new(),
            recv_buf: vec![0u8; MAX_DATAGRAM],
        }
    }

    /// Local socket address (useful when bound to port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Current peer, if one is known
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

#[async_trait::async_trait]
impl Transport for UdpTransport {
    async fn send(&mut self, header: MavHeader, message: &MavMessage) -> Result<()> {
        let Some(peer) = self.peer else {
            debug!("No UDP peer yet, dropping {}", message.message_name());
            return Ok(());
        };
        let frame = encode_v2(header, message)?;
        self.socket.send_to(&frame, peer).await?;
        trace!("TX {} to {}", message.message_name(), peer);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Received> {
        loop {
            if let Some((header, message)) = self.decoder.next_message() {
                return Ok(Received::now(header, message));
            }

            let (len, from) = self.socket.recv_from(&mut self.recv_buf).await?;
            if !self.fixed_peer && self.peer != Some(from) {
                debug!("UDP peer is now {}", from);
                self.peer = Some(from);
            }
            self.decoder.extend(&self.recv_buf[..len]);
        }
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the socket releases the port; forget the peer so a late send is a no-op
        self.peer = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::common::{HEARTBEAT_DATA, MavAutopilot, MavModeFlag, MavState, MavType};

    fn heartbeat(mavtype: MavType) -> MavMessage {
        MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            custom_mode: 0,
            mavtype,
            autopilot: MavAutopilot::MAV_AUTOPILOT_PX4,
            base_mode: MavModeFlag::empty(),
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        })
    }

    #[tokio::test]
    async fn listen_mode_learns_peer_and_replies() {
        let mut gcs = UdpTransport::listen("127.0.0.1:0").await.unwrap();
        let gcs_addr = gcs.local_addr().unwrap();
        assert!(gcs.peer().is_none());

        let mut vehicle = UdpTransport::send_to(&gcs_addr.to_string()).await.unwrap();
        let vehicle_header = MavHeader { system_id: 1, component_id: 1, sequence: 0 };
        vehicle.send(vehicle_header, &heartbeat(MavType::MAV_TYPE_QUADROTOR)).await.unwrap();

        let received = gcs.recv().await.unwrap();
        assert_eq!(received.header.system_id, 1);
        assert!(matches!(received.message, MavMessage::HEARTBEAT(_)));
        assert_eq!(gcs.peer().map(|p| p.port()), Some(vehicle.local_addr().unwrap().port()));

        let gcs_header = MavHeader { system_id: 255, component_id: 190, sequence: 0 };
        gcs.send(gcs_header, &heartbeat(MavType::MAV_TYPE_GCS)).await.unwrap();
        let reply = vehicle.recv().await.unwrap();
        assert_eq!(reply.header.system_id, 255);
    }

    #[tokio::test]
    async fn send_without_peer_is_noop() {
        let mut gcs = UdpTransport::listen("127.0.0.1:0").await.unwrap();
        let header = MavHeader { system_id: 255, component_id: 190, sequence: 0 };
        assert!(gcs.send(header, &heartbeat(MavType::MAV_TYPE_GCS)).await.is_ok());
    }
}
