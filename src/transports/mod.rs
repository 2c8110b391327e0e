//! Concrete MAVLink transports
//!
//! - [`UdpTransport`]: listen (`udpin`) or fixed-peer (`udpout`) datagrams
//! - [`TcpTransport`]: TCP client stream
//! - [`SerialTransport`]: telemetry radio or USB serial port
//! - [`ChannelTransport`]: in-process loopback for simulated vehicles

pub mod channel;
pub mod serial;
pub mod stream;
pub mod tcp;
pub mod udp;

pub use channel::{ChannelConnector, ChannelTransport};
pub use serial::SerialTransport;
pub use stream::StreamTransport;
pub use tcp::TcpTransport;
pub use udp::UdpTransport;
