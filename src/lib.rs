//! MAVLink ground-control link for telemetry relay and mission upload.
//!
//! `mavgcs` talks to a MAVLink vehicle (PX4, ArduPilot, SITL) over UDP, TCP
//! or a serial radio and offers two protocol engines on top of one
//! [`LinkSession`]:
//!
//! - [`TelemetryRelay`] streams position fixes and link status to any number
//!   of consumers and reconnects forever with a fixed backoff.
//! - [`MissionUploader`] runs the mission clear/count/request/ack handshake
//!   once and reports a terminal [`UploadResult`].
//!
//! # Quick Start
//!
//! ## Upload a mission
//!
//! ```rust,no_run
//! use mavgcs::{GcsConfig, GroundControl, MissionFile, WaypointSource};
//!
//! #[tokio::main]
//! async fn main() -> mavgcs::Result<()> {
//!     let mission = MissionFile::new("survey.plan").load()?;
//!     let config = GcsConfig::default();
//!     let result = GroundControl::upload("udp:127.0.0.1:14550", &mission, &config).await?;
//!     println!("{result}");
//!     Ok(())
//! }
//! ```
//!
//! ## Follow telemetry
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use mavgcs::{GcsConfig, GroundControl, TelemetryEvent, UpdateRate};
//!
//! #[tokio::main]
//! async fn main() -> mavgcs::Result<()> {
//!     let relay = GroundControl::relay("udp:127.0.0.1:14551", &GcsConfig::default())?;
//!     let handle = relay.start();
//!     let mut events = handle.subscribe_at(UpdateRate::Max(2));
//!
//!     while let Some(event) = events.next().await {
//!         if let TelemetryEvent::Sample(fix) = event {
//!             println!("{:.7}, {:.7} @ {} m", fix.latitude, fix.longitude, fix.relative_altitude_m);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Link layer
pub mod endpoint;
pub mod framing;
pub mod session;
pub mod transport;
pub mod transports;

// Protocol engines
pub mod mission;
pub mod relay;
pub mod stream;
pub mod telemetry;

// Core exports
pub use config::GcsConfig;
pub use error::*;
pub use types::UpdateRate;

// Link exports
pub use endpoint::Endpoint;
pub use session::{ConnectionState, LinkSession, VehicleIdentity};
pub use transport::{Connector, Received, Transport};

// Engine exports
pub use mission::{
    AbortReason, HandshakeStep, MissionCommand, MissionFile, MissionFrame, MissionList, MissionUploader,
    SquarePattern, UploadOutcome, UploadResult, Waypoint, WaypointSource,
};
pub use relay::{RelayHandle, TelemetryRelay};
pub use telemetry::{LinkStatus, StatusEvent, TelemetryEvent, TelemetrySample};

/// Entry point wiring connection strings and configuration to the engines.
///
/// Both engines can also be built by hand from a [`LinkSession`] when a
/// custom [`Connector`] is needed.
pub struct GroundControl;

impl GroundControl {
    /// Build a relay for a connection string.
    ///
    /// The relay is not started, so consumers can subscribe first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEndpoint` if the connection string cannot be parsed.
    pub fn relay(endpoint: &str, config: &GcsConfig) -> Result<TelemetryRelay> {
        let endpoint: Endpoint = endpoint.parse()?;
        let session = LinkSession::new(endpoint, config.link.clone());
        Ok(TelemetryRelay::new(session, config.relay.clone()))
    }

    /// Run one mission upload attempt over a connection string.
    ///
    /// Handshake failures are reported in the returned [`UploadResult`];
    /// use [`UploadResult::into_result`] to turn them into errors.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEndpoint` if the connection string cannot be parsed.
    pub async fn upload(endpoint: &str, mission: &MissionList, config: &GcsConfig) -> Result<UploadResult> {
        let endpoint: Endpoint = endpoint.parse()?;
        let session = LinkSession::new(endpoint, config.link.clone());
        let mut uploader = MissionUploader::new(session, config.upload.clone());
        Ok(uploader.upload(mission).await)
    }
}
