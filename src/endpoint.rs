//! Connection strings.
//!
//! Accepts the same spellings ground-station tools use:
//!
//! | String                     | Meaning                                    |
//! |----------------------------|--------------------------------------------|
//! | `udp:127.0.0.1:14550`      | listen on the address, reply to the sender |
//! | `udpin:0.0.0.0:14550`      | same as `udp:`                             |
//! | `udpout:10.0.0.2:14550`    | send to a fixed peer                       |
//! | `tcp:127.0.0.1:5760`       | TCP client                                 |
//! | `serial:/dev/ttyUSB0:57600`| serial port with explicit baud             |
//! | `/dev/ttyACM0`, `COM3`     | serial port at the default baud            |

use std::fmt;
use std::str::FromStr;

use crate::transport::{Connector, Transport};
use crate::transports::{SerialTransport, TcpTransport, UdpTransport};
use crate::{GcsError, Result};

/// Baud rate used when a serial connection string does not name one.
pub const DEFAULT_BAUD: u32 = 115_200;

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Bind locally and learn the peer from the first datagram.
    UdpListen { address: String },
    /// Send to a fixed remote peer.
    UdpSend { address: String },
    /// Connect to a TCP server.
    Tcp { address: String },
    /// Open a serial device.
    Serial { path: String, baud: u32 },
}

impl FromStr for Endpoint {
    type Err = GcsError;

    fn from_str(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(GcsError::invalid_endpoint(input, "empty connection string"));
        }

        if let Some((scheme, rest)) = input.split_once(':') {
            match scheme.to_ascii_lowercase().as_str() {
                "udp" | "udpin" => {
                    return Ok(Endpoint::UdpListen { address: host_port(input, rest)? });
                }
                "udpout" => return Ok(Endpoint::UdpSend { address: host_port(input, rest)? }),
                "tcp" => return Ok(Endpoint::Tcp { address: host_port(input, rest)? }),
                "serial" => return serial(input, rest),
                _ => {}
            }
        }

        if looks_like_device(input) {
            return Ok(Endpoint::Serial { path: input.to_string(), baud: DEFAULT_BAUD });
        }

        Err(GcsError::invalid_endpoint(input, "unknown scheme"))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::UdpListen { address } => write!(f, "udpin:{address}"),
            Endpoint::UdpSend { address } => write!(f, "udpout:{address}"),
            Endpoint::Tcp { address } => write!(f, "tcp:{address}"),
            Endpoint::Serial { path, baud } => write!(f, "serial:{path}:{baud}"),
        }
    }
}

#[async_trait::async_trait]
impl Connector for Endpoint {
    async fn open(&self) -> Result<Box<dyn Transport>> {
        let transport: Box<dyn Transport> = match self {
            Endpoint::UdpListen { address } => Box::new(UdpTransport::listen(address).await?),
            Endpoint::UdpSend { address } => Box::new(UdpTransport::send_to(address).await?),
            Endpoint::Tcp { address } => Box::new(TcpTransport::connect(address).await?),
            Endpoint::Serial { path, baud } => Box::new(SerialTransport::open(path, *baud)?),
        };
        Ok(transport)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

fn host_port(input: &str, rest: &str) -> Result<String> {
    let (host, port) = rest
        .rsplit_once(':')
        .ok_or_else(|| GcsError::invalid_endpoint(input, "expected HOST:PORT"))?;
    if host.is_empty() {
        return Err(GcsError::invalid_endpoint(input, "missing host"));
    }
    port.parse::<u16>()
        .map_err(|_| GcsError::invalid_endpoint(input, format!("invalid port '{port}'")))?;
    Ok(rest.to_string())
}

fn serial(input: &str, rest: &str) -> Result<Endpoint> {
    // The baud suffix is optional, and Windows paths never contain ':' after "serial:"
    match rest.rsplit_once(':') {
        Some((path, baud)) if !path.is_empty() && baud.chars().all(|c| c.is_ascii_digit()) => {
            let baud = baud
                .parse::<u32>()
                .map_err(|_| GcsError::invalid_endpoint(input, format!("invalid baud '{baud}'")))?;
            Ok(Endpoint::Serial { path: path.to_string(), baud })
        }
        _ if !rest.is_empty() => Ok(Endpoint::Serial { path: rest.to_string(), baud: DEFAULT_BAUD }),
        _ => Err(GcsError::invalid_endpoint(input, "missing serial device path")),
    }
}

fn looks_like_device(input: &str) -> bool {
    let upper = input.to_ascii_uppercase();
    input.starts_with('/')
        || (upper.starts_with("COM") && upper[3..].chars().all(|c| c.is_ascii_digit()) && upper.len() > 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn udp_defaults_to_listening() {
        let endpoint: Endpoint = "udp:127.0.0.1:14551".parse().unwrap();
        assert_eq!(endpoint, Endpoint::UdpListen { address: "127.0.0.1:14551".into() });
        assert_eq!(endpoint.to_string(), "udpin:127.0.0.1:14551");
    }

    #[test]
    fn outbound_and_tcp_schemes() {
        assert_eq!(
            "udpout:10.0.0.2:14550".parse::<Endpoint>().unwrap(),
            Endpoint::UdpSend { address: "10.0.0.2:14550".into() }
        );
        assert_eq!(
            "TCP:localhost:5760".parse::<Endpoint>().unwrap(),
            Endpoint::Tcp { address: "localhost:5760".into() }
        );
    }

    #[test]
    fn serial_paths_and_baud() {
        assert_eq!(
            "serial:/dev/ttyUSB0:57600".parse::<Endpoint>().unwrap(),
            Endpoint::Serial { path: "/dev/ttyUSB0".into(), baud: 57600 }
        );
        assert_eq!(
            "/dev/ttyACM0".parse::<Endpoint>().unwrap(),
            Endpoint::Serial { path: "/dev/ttyACM0".into(), baud: DEFAULT_BAUD }
        );
        assert_eq!(
            "COM3".parse::<Endpoint>().unwrap(),
            Endpoint::Serial { path: "COM3".into(), baud: DEFAULT_BAUD }
        );
        assert_eq!(
            "serial:COM7".parse::<Endpoint>().unwrap(),
            Endpoint::Serial { path: "COM7".into(), baud: DEFAULT_BAUD }
        );
    }

    #[test]
    fn rejects_malformed_strings() {
        for bad in ["", "udp:14550", "udp:host:notaport", "ftp:host:21", "serial:", "COMX"] {
            let err = bad.parse::<Endpoint>().unwrap_err();
            assert!(matches!(err, GcsError::InvalidEndpoint { .. }), "{bad} should be rejected");
        }
    }
}
