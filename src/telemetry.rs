//! Telemetry event model published by the relay

use mavlink::common::{GLOBAL_POSITION_INT_DATA, MavMessage};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::transport::Received;

/// One decoded position fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Degrees, WGS84
    pub latitude: f64,
    /// Degrees, WGS84
    pub longitude: f64,
    /// Metres above home, rounded to centimetres
    pub relative_altitude_m: f64,
    /// Receipt time in milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl TelemetrySample {
    /// Convert a `GLOBAL_POSITION_INT` payload
    pub fn from_position(data: &GLOBAL_POSITION_INT_DATA, received_at: SystemTime) -> Self {
        let relative_altitude_m = (f64::from(data.relative_alt) / 1000.0 * 100.0).round() / 100.0;
        let timestamp_ms = received_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            latitude: f64::from(data.lat) / 1e7,
            longitude: f64::from(data.lon) / 1e7,
            relative_altitude_m,
            timestamp_ms,
        }
    }

    /// Decode a sample if the message carries a position
    pub fn decode(received: &Received) -> Option<Self> {
        match &received.message {
            MavMessage::GLOBAL_POSITION_INT(data) => Some(Self::from_position(data, received.received_at)),
            _ => None,
        }
    }
}

/// Link status as shown to display consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Idle,
    Connecting,
    Connected,
    Timeout,
    Reconnecting,
    Error,
    Stopped,
}

/// A status transition with its human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: LinkStatus,
    pub message: String,
}

impl StatusEvent {
    pub fn new(status: LinkStatus, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn idle() -> Self {
        Self::new(LinkStatus::Idle, "MAVLink idle")
    }

    pub fn connecting(endpoint: &str) -> Self {
        Self::new(LinkStatus::Connecting, format!("Connecting to {endpoint}..."))
    }

    pub fn connected() -> Self {
        Self::new(LinkStatus::Connected, "MAVLink Connected")
    }

    pub fn timeout() -> Self {
        Self::new(LinkStatus::Timeout, "MAVLink Timeout. Reconnecting...")
    }

    pub fn reconnecting() -> Self {
        Self::new(LinkStatus::Reconnecting, "No heartbeat. Reconnecting...")
    }

    pub fn error(reason: impl std::fmt::Display) -> Self {
        Self::new(LinkStatus::Error, format!("MAVLink Error: {reason}"))
    }

    pub fn stopped() -> Self {
        Self::new(LinkStatus::Stopped, "MAVLink relay stopped")
    }
}

/// Everything a display consumer receives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    StatusChanged(StatusEvent),
    Sample(TelemetrySample),
}

impl TelemetryEvent {
    pub fn is_sample(&self) -> bool {
        matches!(self, TelemetryEvent::Sample(_))
    }

    pub fn status(&self) -> Option<LinkStatus> {
        match self {
            TelemetryEvent::StatusChanged(event) => Some(event.status),
            TelemetryEvent::Sample(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::MavHeader;
    use std::time::Duration;

    fn position(lat: i32, lon: i32, relative_alt: i32) -> GLOBAL_POSITION_INT_DATA {
        GLOBAL_POSITION_INT_DATA {
            time_boot_ms: 0,
            lat,
            lon,
            alt: 0,
            relative_alt,
            vx: 0,
            vy: 0,
            vz: 0,
            hdg: 0,
        }
    }

    #[test]
    fn decodes_reference_position() {
        let at = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        let sample = TelemetrySample::from_position(&position(473977420, 85455940, 20000), at);
        assert!((sample.latitude - 47.397742).abs() < 1e-9);
        assert!((sample.longitude - 8.545594).abs() < 1e-9);
        assert_eq!(sample.relative_altitude_m, 20.00);
        assert_eq!(sample.timestamp_ms, 1_700_000_000_123);
    }

    #[test]
    fn relative_altitude_rounds_to_centimetres() {
        let sample = TelemetrySample::from_position(&position(0, 0, 12346), UNIX_EPOCH);
        assert_eq!(sample.relative_altitude_m, 12.35);
        let below_home = TelemetrySample::from_position(&position(0, 0, -1504), UNIX_EPOCH);
        assert_eq!(below_home.relative_altitude_m, -1.5);
    }

    #[test]
    fn only_positions_decode() {
        let header = MavHeader { system_id: 1, component_id: 1, sequence: 0 };
        let heartbeat = Received::now(header, crate::session::gcs_heartbeat());
        assert!(TelemetrySample::decode(&heartbeat).is_none());

        let fix = Received::now(header, MavMessage::GLOBAL_POSITION_INT(position(1, 2, 3)));
        assert!(TelemetrySample::decode(&fix).is_some());
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_string(&TelemetryEvent::StatusChanged(StatusEvent::timeout())).unwrap();
        assert_eq!(json, r#"{"event":"status_changed","status":"timeout","message":"MAVLink Timeout. Reconnecting..."}"#);
    }
}
