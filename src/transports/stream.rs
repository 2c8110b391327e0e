//! Byte-stream transport shared by TCP and serial links

use mavlink::common::MavMessage;
use mavlink::{MavHeader, Message};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::framing::{FrameDecoder, MAX_FRAME_LEN, encode_v2};
use crate::transport::{Received, Transport};
use crate::{GcsError, Result};

/// MAVLink over any async byte stream
pub struct StreamTransport<S> {
    stream: S,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
    label: String,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an already-open stream
    pub fn new(stream: S, label: impl Into<String>) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
            read_buf: vec![0u8; 2 * MAX_FRAME_LEN],
            label: label.into(),
        }
    }
}

#[async_trait::async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, header: MavHeader, message: &MavMessage) -> Result<()> {
        let frame = encode_v2(header, message)?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        trace!("TX {} on {}", message.message_name(), self.label);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Received> {
        loop {
            if let Some((header, message)) = self.decoder.next_message() {
                return Ok(Received::now(header, message));
            }

            let n = self.stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Err(GcsError::link_lost(format!("{} closed by peer", self.label)));
            }
            self.decoder.extend(&self.read_buf[..n]);
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::common::{MISSION_COUNT_DATA, MavMissionType};

    #[tokio::test]
    async fn frames_cross_a_duplex_pipe() {
        let (left, right) = tokio::io::duplex(64);
        let mut gcs = StreamTransport::new(left, "pipe-gcs");
        let mut vehicle = StreamTransport::new(right, "pipe-vehicle");

        let header = MavHeader { system_id: 255, component_id: 190, sequence: 9 };
        let count = MavMessage::MISSION_COUNT(MISSION_COUNT_DATA {
            target_system: 1,
            target_component: 1,
            count: 5,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
            opaque_id: 0,
        });

        // The pipe is smaller than a frame, so send and receive concurrently
        let (sent, received) = tokio::join!(gcs.send(header, &count), vehicle.recv());
        sent.unwrap();
        let received = received.unwrap();
        assert_eq!(received.header.sequence, 9);
        assert!(matches!(received.message, MavMessage::MISSION_COUNT(ref d) if d.count == 5));
    }

    #[tokio::test]
    async fn eof_is_link_loss() {
        let (left, right) = tokio::io::duplex(64);
        let mut vehicle = StreamTransport::new(right, "pipe-vehicle");
        drop(left);
        let err = vehicle.recv().await.unwrap_err();
        assert!(matches!(err, GcsError::LinkLost { .. }));
    }
}
