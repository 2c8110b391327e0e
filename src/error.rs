//! Error types for the ground-control link.
//!
//! All errors implement `std::error::Error` and carry enough context to tell
//! a flaky radio apart from a bad mission file.
//!
//! ## Error Categories
//!
//! - **Connect failures**: no heartbeat from the vehicle within the bound
//! - **Link loss**: transport errors or read timeouts on an open link
//! - **Protocol errors**: a handshake reply never arrived, or the vehicle declined
//! - **Source errors**: a mission file or waypoint list that fails validation
//! - **Setup errors**: bad connection strings or configuration files
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use mavgcs::GcsError;
//!
//! let error = GcsError::link_lost("radio unplugged");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for ground-control operations.
pub type Result<T, E = GcsError> = std::result::Result<T, E>;

/// Main error type for ground-control operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GcsError {
    #[error("Failed to connect to vehicle on {endpoint}: {reason}")]
    ConnectFailure { endpoint: String, reason: String },

    #[error("MAVLink link lost: {reason}")]
    LinkLost {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("No reply to {step} within {duration:?}")]
    ProtocolTimeout { step: String, duration: Duration },

    #[error("Vehicle rejected the mission: {code}")]
    ProtocolRejected { code: String },

    #[error("Malformed mission source {origin}: {reason}")]
    MalformedSource { origin: String, reason: String },

    #[error("Invalid connection string '{input}': {reason}")]
    InvalidEndpoint { input: String, reason: String },

    #[error("Mission file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("MAVLink codec error: {details}")]
    Codec { details: String },
}

impl GcsError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            GcsError::ConnectFailure { .. } => true,
            GcsError::LinkLost { .. } => true,
            GcsError::ProtocolTimeout { .. } => true,
            GcsError::ProtocolRejected { .. } => false,
            GcsError::MalformedSource { .. } => false,
            GcsError::InvalidEndpoint { .. } => false,
            GcsError::File { .. } => false,
            GcsError::Config { .. } => false,
            GcsError::Codec { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            GcsError::ConnectFailure { .. } => vec![
                "Check the vehicle or SITL instance is running",
                "Verify the connection string matches the vehicle's output port",
                "Check firewall rules for the UDP port",
            ],
            GcsError::LinkLost { .. } => vec![
                "Check the telemetry radio or cable",
                "Move closer to the vehicle or reduce interference",
                "Wait for the link to recover and retry",
            ],
            GcsError::ProtocolTimeout { .. } => vec![
                "Retry the upload from the beginning",
                "Check link quality before uploading",
                "Increase the handshake step timeout",
            ],
            GcsError::ProtocolRejected { .. } => vec![
                "Check the mission fits the vehicle's storage",
                "Verify the commands are supported by the autopilot",
                "Inspect the autopilot's status text for details",
            ],
            GcsError::MalformedSource { .. } => vec![
                "Re-export the mission from the planning tool",
                "Check the file header and column count",
                "Use a .plan or QGC WPL .txt file",
            ],
            GcsError::InvalidEndpoint { .. } => vec![
                "Use udp:HOST:PORT, udpout:HOST:PORT or tcp:HOST:PORT",
                "Use serial:/dev/ttyUSB0:57600 or a bare device path",
            ],
            GcsError::File { .. } => vec![
                "Check the file exists and is readable",
                "Check file permissions",
            ],
            GcsError::Config { .. } => vec![
                "Check the YAML syntax of the configuration file",
                "Remove unknown keys or fix value types",
            ],
            GcsError::Codec { .. } => vec![
                "Check the vehicle speaks the common MAVLink dialect",
                "Report the message that failed to encode",
            ],
        }
    }

    /// Helper constructor for connect failures.
    pub fn connect_failed(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        GcsError::ConnectFailure { endpoint: endpoint.into(), reason: reason.into() }
    }

    /// Helper constructor for link loss without an underlying error.
    pub fn link_lost(reason: impl Into<String>) -> Self {
        GcsError::LinkLost { reason: reason.into(), source: None }
    }

    /// Helper constructor for link loss with source.
    pub fn link_lost_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        GcsError::LinkLost { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for malformed mission sources.
    pub fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        GcsError::MalformedSource { origin: origin.into(), reason: reason.into() }
    }

    /// Helper constructor for mission file I/O errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        GcsError::File { path, source }
    }

    /// Helper constructor for connection string errors.
    pub fn invalid_endpoint(input: impl Into<String>, reason: impl Into<String>) -> Self {
        GcsError::InvalidEndpoint { input: input.into(), reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        GcsError::Config { reason: reason.into() }
    }

    /// Helper constructor for codec errors.
    pub fn codec(details: impl Into<String>) -> Self {
        GcsError::Codec { details: details.into() }
    }
}

// Transport I/O is the only place raw io::Error escapes; file reads use file_error.
impl From<std::io::Error> for GcsError {
    fn from(err: std::io::Error) -> Self {
        GcsError::LinkLost { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}
