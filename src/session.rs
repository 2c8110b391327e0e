//! Link Session: one logical MAVLink connection to a vehicle
//!
//! A session owns a [`Connector`] and at most one open [`Transport`]. It
//! performs the heartbeat handshake, stamps outgoing headers and filters
//! incoming traffic. It never retries on its own; the relay and the uploader
//! layer their own restart policy on top.

use mavlink::MavHeader;
use mavlink::common::{HEARTBEAT_DATA, MavAutopilot, MavMessage, MavModeFlag, MavState, MavType};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::LinkConfig;
use crate::transport::{Connector, Received, Transport};
use crate::{GcsError, Result};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    AwaitingHeartbeat,
    Connected,
}

/// System and component the vehicle announced in its first heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleIdentity {
    pub system_id: u8,
    pub component_id: u8,
}

/// The heartbeat this station announces itself with
pub fn gcs_heartbeat() -> MavMessage {
    MavMessage::HEARTBEAT(HEARTBEAT_DATA {
        custom_mode: 0,
        mavtype: MavType::MAV_TYPE_GCS,
        autopilot: MavAutopilot::MAV_AUTOPILOT_INVALID,
        base_mode: MavModeFlag::empty(),
        system_status: MavState::MAV_STATE_ACTIVE,
        mavlink_version: 3,
    })
}

fn is_vehicle_heartbeat(message: &MavMessage) -> bool {
    matches!(message, MavMessage::HEARTBEAT(data) if data.mavtype != MavType::MAV_TYPE_GCS)
}

/// An exclusively owned MAVLink connection
pub struct LinkSession {
    connector: Box<dyn Connector>,
    config: LinkConfig,
    transport: Option<Box<dyn Transport>>,
    state: watch::Sender<ConnectionState>,
    vehicle: Option<VehicleIdentity>,
    sequence: u8,
}

impl LinkSession {
    /// Create a disconnected session
    pub fn new<C: Connector>(connector: C, config: LinkConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector: Box::new(connector),
            config,
            transport: None,
            state,
            vehicle: None,
            sequence: 0,
        }
    }

    /// Open a fresh transport and wait for the vehicle's heartbeat
    ///
    /// Returns `Connected` once a non-GCS heartbeat arrives within the
    /// configured bound, `Disconnected` otherwise.
    pub async fn connect(&mut self) -> ConnectionState {
        self.drop_transport().await;
        self.state.send_replace(ConnectionState::AwaitingHeartbeat);

        let label = self.connector.describe();
        info!("Connecting to MAVLink on {}", label);

        let mut transport = match self.connector.open().await {
            Ok(transport) => transport,
            Err(e) => {
                warn!("Failed to open {}: {}", label, e);
                self.state.send_replace(ConnectionState::Disconnected);
                return ConnectionState::Disconnected;
            }
        };

        // On a listening UDP socket this is a no-op until the vehicle speaks first
        let header = self.next_header();
        if let Err(e) = transport.send(header, &gcs_heartbeat()).await {
            debug!("GCS heartbeat not sent on {}: {}", label, e);
        }
        self.transport = Some(transport);

        let timeout = self.config.heartbeat_timeout;
        match self.receive_matching(is_vehicle_heartbeat, timeout).await {
            Ok(Some(received)) => {
                let identity = VehicleIdentity {
                    system_id: received.header.system_id,
                    component_id: received.header.component_id,
                };
                info!(
                    "Heartbeat from system {} component {} on {}",
                    identity.system_id, identity.component_id, label
                );
                self.vehicle = Some(identity);
                self.state.send_replace(ConnectionState::Connected);
                ConnectionState::Connected
            }
            Ok(None) => {
                warn!("No heartbeat on {} within {:?}", label, timeout);
                ConnectionState::Disconnected
            }
            Err(e) => {
                warn!("Link failed on {} while awaiting heartbeat: {}", label, e);
                ConnectionState::Disconnected
            }
        }
    }

    /// Send one message to the vehicle, best-effort
    ///
    /// A transport failure closes the link and is reported as `LinkLost`.
    pub async fn send(&mut self, message: &MavMessage) -> Result<()> {
        let header = self.next_header();
        let Some(transport) = self.transport.as_mut() else {
            return Err(GcsError::link_lost("session is not connected"));
        };

        let result = transport.send(header, message).await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                self.drop_transport().await;
                Err(match e {
                    lost @ GcsError::LinkLost { .. } => lost,
                    other => GcsError::link_lost_with_source("send failed", Box::new(other)),
                })
            }
        }
    }

    /// Wait for the first message satisfying `predicate`
    ///
    /// Non-matching traffic is discarded. `Ok(None)` means `timeout` elapsed;
    /// both a timeout and a transport error close the link.
    pub async fn receive_matching<F>(&mut self, mut predicate: F, timeout: Duration) -> Result<Option<Received>>
    where
        F: FnMut(&MavMessage) -> bool + Send,
    {
        let deadline = Instant::now() + timeout;
        let Some(transport) = self.transport.as_mut() else {
            return Err(GcsError::link_lost("session is not connected"));
        };

        let outcome = loop {
            match tokio::time::timeout_at(deadline, transport.recv()).await {
                Err(_) => break None,
                Ok(Ok(received)) => {
                    if predicate(&received.message) {
                        break Some(Ok(received));
                    }
                    trace!("Discarding message from system {}", received.header.system_id);
                }
                Ok(Err(e)) => break Some(Err(e)),
            }
        };

        match outcome {
            Some(Ok(received)) => Ok(Some(received)),
            Some(Err(e)) => {
                self.drop_transport().await;
                Err(e)
            }
            None => {
                debug!("Receive timed out after {:?}", timeout);
                self.drop_transport().await;
                Ok(None)
            }
        }
    }

    /// Release the transport; calling it again is harmless
    pub async fn close(&mut self) {
        if self.transport.is_some() {
            info!("Closing MAVLink link on {}", self.connector.describe());
        }
        self.drop_transport().await;
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Identity captured by the last successful connect
    pub fn vehicle(&self) -> Option<VehicleIdentity> {
        self.vehicle
    }

    pub fn describe(&self) -> String {
        self.connector.describe()
    }

    fn next_header(&mut self) -> MavHeader {
        let header = MavHeader {
            system_id: self.config.system_id,
            component_id: self.config.component_id,
            sequence: self.sequence,
        };
        self.sequence = self.sequence.wrapping_add(1);
        header
    }

    async fn drop_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("Error while closing transport: {}", e);
            }
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }
}
