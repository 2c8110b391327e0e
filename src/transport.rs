//! Transport traits for MAVLink links

use mavlink::MavHeader;
use mavlink::common::MavMessage;
use std::time::SystemTime;

use crate::Result;

/// A decoded MAVLink message together with its receipt time.
#[derive(Debug, Clone)]
pub struct Received {
    /// Header of the frame, naming the sender's system and component
    pub header: MavHeader,
    /// The decoded message
    pub message: MavMessage,
    /// Wall-clock receipt time
    pub received_at: SystemTime,
}

impl Received {
    /// Stamp a message as received now
    pub fn now(header: MavHeader, message: MavMessage) -> Self {
        Self { header, message, received_at: SystemTime::now() }
    }
}

/// One open, bidirectional MAVLink byte pipe.
///
/// Transports only move messages. Heartbeat tracking, timeouts and
/// reconnection belong to the session on top of them.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Send one message, best-effort
    ///
    /// An error means the link is unusable; the caller must not retry on
    /// the same transport.
    async fn send(&mut self, header: MavHeader, message: &MavMessage) -> Result<()>;

    /// Wait for the next decodable message
    ///
    /// Must be cancel-safe: dropping the future before it resolves may not
    /// lose buffered bytes, because sessions race it against timeouts.
    async fn recv(&mut self) -> Result<Received>;

    /// Release the underlying resources
    async fn close(&mut self) -> Result<()>;
}

/// Factory for transports.
///
/// Sessions hold a connector rather than a transport so that every
/// reconnect starts from a fresh socket or port handle.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a new transport
    async fn open(&self) -> Result<Box<dyn Transport>>;

    /// Human-readable name for logs and status messages
    fn describe(&self) -> String;
}
