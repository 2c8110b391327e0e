//! Serial port transport

use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::info;

use super::stream::StreamTransport;
use crate::{GcsError, Result};

/// MAVLink over a serial device (telemetry radio, USB autopilot)
pub type SerialTransport = StreamTransport<SerialStream>;

impl StreamTransport<SerialStream> {
    /// Open a serial device at the given baud rate
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let label = format!("serial:{path}:{baud}");
        let port = tokio_serial::new(path, baud)
            .open_native_async()
            .map_err(|e| GcsError::connect_failed(&label, e.to_string()))?;
        info!("Opened MAVLink serial port {}", label);
        Ok(Self::new(port, label))
    }
}
