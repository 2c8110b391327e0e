//! TCP client transport

use tokio::net::TcpStream;
use tracing::info;

use super::stream::StreamTransport;
use crate::{GcsError, Result};

/// MAVLink over a TCP client connection (e.g. SITL on port 5760)
pub type TcpTransport = StreamTransport<TcpStream>;

impl StreamTransport<TcpStream> {
    /// Connect to a TCP MAVLink server
    pub async fn connect(address: &str) -> Result<Self> {
        let label = format!("tcp:{address}");
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| GcsError::connect_failed(&label, e.to_string()))?;
        stream.set_nodelay(true)?;
        info!("Connected to MAVLink over {}", label);
        Ok(Self::new(stream, label))
    }
}
