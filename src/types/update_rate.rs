//! Update rate control for telemetry streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sample rate requested by a telemetry consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every sample the vehicle sends
    Native,

    /// At most this many samples per second
    /// Zero is treated as Native
    Max(u32),
}

impl UpdateRate {
    /// Build from an optional CLI rate in Hz
    pub fn from_hz(hz: Option<u32>) -> Self {
        match hz {
            Some(hz) if hz > 0 => UpdateRate::Max(hz),
            _ => UpdateRate::Native,
        }
    }

    /// Check if throttling is needed
    pub fn needs_throttle(self) -> bool {
        self.throttle_interval().is_some()
    }

    /// Get throttle interval if needed
    pub fn throttle_interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_map_to_intervals() {
        assert_eq!(UpdateRate::Native.throttle_interval(), None);
        assert_eq!(UpdateRate::Max(0).throttle_interval(), None);
        assert_eq!(UpdateRate::Max(4).throttle_interval(), Some(Duration::from_millis(250)));
        assert!(UpdateRate::from_hz(Some(10)).needs_throttle());
        assert_eq!(UpdateRate::from_hz(Some(0)), UpdateRate::Native);
        assert_eq!(UpdateRate::from_hz(None), UpdateRate::Native);
    }
}
