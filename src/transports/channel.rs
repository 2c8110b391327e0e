//! In-process loopback transport
//!
//! A [`ChannelTransport`] pair behaves like a lossless radio link between a
//! ground station and a simulated vehicle. [`ChannelConnector`] mints a new
//! pair on every connect and hands the vehicle end to whoever plays the
//! vehicle, so reconnect cycles can be exercised without sockets.

use mavlink::MavHeader;
use mavlink::common::MavMessage;
use tokio::sync::mpsc;

use crate::transport::{Connector, Received, Transport};
use crate::{GcsError, Result};

type Frame = (MavHeader, MavMessage);

/// One end of an in-memory MAVLink link
pub struct ChannelTransport {
    tx: Option<mpsc::UnboundedSender<Frame>>,
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl ChannelTransport {
    /// Create two connected ends
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (Self { tx: Some(a_tx), rx: b_rx }, Self { tx: Some(b_tx), rx: a_rx })
    }

    /// Whether the other end is still attached
    pub fn is_open(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, header: MavHeader, message: &MavMessage) -> Result<()> {
        let tx = self.tx.as_ref().ok_or_else(|| GcsError::link_lost("channel closed"))?;
        tx.send((header, message.clone())).map_err(|_| GcsError::link_lost("channel peer dropped"))
    }

    async fn recv(&mut self) -> Result<Received> {
        match self.rx.recv().await {
            Some((header, message)) => Ok(Received::now(header, message)),
            None => Err(GcsError::link_lost("channel peer dropped")),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        self.rx.close();
        Ok(())
    }
}

/// Connector that hands the far end of each new link to a simulator
pub struct ChannelConnector {
    peers: mpsc::UnboundedSender<ChannelTransport>,
    label: String,
}

impl ChannelConnector {
    /// Create a connector and the receiver on which vehicle ends arrive
    pub fn new(label: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<ChannelTransport>) {
        let (peers, accepted) = mpsc::unbounded_channel();
        (Self { peers, label: label.into() }, accepted)
    }
}

#[async_trait::async_trait]
impl Connector for ChannelConnector {
    async fn open(&self) -> Result<Box<dyn Transport>> {
        let (local, remote) = ChannelTransport::pair();
        self.peers
            .send(remote)
            .map_err(|_| GcsError::connect_failed(&self.label, "no simulator accepting links"))?;
        Ok(Box::new(local))
    }

    fn describe(&self) -> String {
        format!("channel:{}", self.label)
    }
}
