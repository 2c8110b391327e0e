//! Runtime configuration.
//!
//! Every field has a default matching the reference ground-station behavior,
//! so an empty YAML document is a valid configuration:
//!
//! ```yaml
//! link:
//!   heartbeat_timeout_ms: 10000
//!   system_id: 255
//!   component_id: 190
//! relay:
//!   idle_timeout_ms: 5000
//!   reconnect_backoff_ms: 5000
//!   event_capacity: 256
//! upload:
//!   step_timeout_ms: 3000
//!   clear_settle_delay_ms: 1000
//!   max_requests_per_item: 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{GcsError, Result};

/// Top-level configuration for both protocol engines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GcsConfig {
    pub link: LinkConfig,
    pub relay: RelayConfig,
    pub upload: UploadConfig,
}

impl GcsConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GcsError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        // serde_yaml_ng rejects an empty document; treat it as all defaults
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(text).map_err(|e| GcsError::config(e.to_string()))
    }
}

/// Link Session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Upper bound on waiting for the first vehicle heartbeat
    #[serde(rename = "heartbeat_timeout_ms", with = "millis")]
    pub heartbeat_timeout: Duration,

    /// MAVLink system id this station sends as
    pub system_id: u8,

    /// MAVLink component id this station sends as (190 = MAV_COMP_ID_MISSIONPLANNER)
    pub component_id: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { heartbeat_timeout: Duration::from_secs(10), system_id: 255, component_id: 190 }
    }
}

/// Telemetry Relay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Silence on an open link longer than this counts as link loss
    #[serde(rename = "idle_timeout_ms", with = "millis")]
    pub idle_timeout: Duration,

    /// Fixed delay between a dropped link and the next connect attempt
    #[serde(rename = "reconnect_backoff_ms", with = "millis")]
    pub reconnect_backoff: Duration,

    /// Broadcast buffer per consumer before it starts lagging
    pub event_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5),
            reconnect_backoff: Duration::from_secs(5),
            event_capacity: 256,
        }
    }
}

/// Mission Transfer Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Timeout for each handshake step
    #[serde(rename = "step_timeout_ms", with = "millis")]
    pub step_timeout: Duration,

    /// Pause between the clear acknowledgement and the count announcement
    #[serde(rename = "clear_settle_delay_ms", with = "millis")]
    pub clear_settle_delay: Duration,

    /// Request budget per mission item; bounds a vehicle stuck re-requesting
    pub max_requests_per_item: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(3),
            clear_settle_delay: Duration::from_secs(1),
            max_requests_per_item: 5,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
