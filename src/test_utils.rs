//! Test utilities for fixture path resolution and simulated frames
//!
//! Fixtures live under `test-data/` at the crate root and are resolved
//! through `CARGO_MANIFEST_DIR`, so tests and benches find them regardless
//! of the working directory.

#![cfg(any(test, feature = "benchmark"))]

use mavlink::MavHeader;
use mavlink::common::{GLOBAL_POSITION_INT_DATA, MavMessage};
use std::path::{Path, PathBuf};

use crate::framing::encode_v2;

/// Error returned when a required fixture cannot be located.
#[derive(Debug, Clone)]
pub struct FixtureError {
    message: String,
}

impl FixtureError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for FixtureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FixtureError {}

/// Require that a specific fixture exists on disk.
pub fn require_fixture<P: AsRef<Path>>(path: P) -> Result<PathBuf, FixtureError> {
    let path_ref = path.as_ref();
    if path_ref.exists() {
        Ok(path_ref.to_path_buf())
    } else {
        Err(FixtureError::new(format!("Missing test fixture: {}", path_ref.display())))
    }
}

/// The `test-data` directory of this crate
pub fn test_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data")
}

/// Resolve a mission file inside `test-data/missions`
pub fn mission_fixture(file_name: &str) -> Result<PathBuf, FixtureError> {
    require_fixture(test_data_dir().join("missions").join(file_name))
}

/// All mission fixtures, sorted by name
pub fn mission_fixtures() -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(test_data_dir().join("missions"))
        .map(|entries| entries.flatten().map(|entry| entry.path()).collect())
        .unwrap_or_default();
    files.sort();
    files
}

/// A `GLOBAL_POSITION_INT` fix at the given raw position
pub fn position_message(lat: i32, lon: i32, relative_alt: i32) -> MavMessage {
    MavMessage::GLOBAL_POSITION_INT(GLOBAL_POSITION_INT_DATA {
        time_boot_ms: 0,
        lat,
        lon,
        alt: relative_alt + 488_000,
        relative_alt,
        vx: 0,
        vy: 0,
        vz: 0,
        hdg: 0,
    })
}

/// A byte stream of `count` position frames, as a radio would deliver it
pub fn position_stream(count: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for n in 0..count {
        let header = MavHeader { system_id: 1, component_id: 1, sequence: n as u8 };
        let message = position_message(473977420 + n as i32, 85455940, 20000);
        if let Ok(frame) = encode_v2(header, &message) {
            bytes.extend(frame);
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_contains_missions() {
        let dir = test_data_dir();
        assert!(dir.join("missions").is_dir(), "test-data/missions should exist");
        let names: Vec<_> = mission_fixtures()
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_owned))
            .collect();
        assert!(names.contains(&"survey.plan".to_string()));
        assert!(names.contains(&"simple.txt".to_string()));
    }

    #[test]
    fn test_require_fixture_errors_when_missing() {
        let result = mission_fixture("__missing_fixture.plan");
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Missing test fixture"));
    }

    #[test]
    fn position_stream_has_one_frame_per_fix() {
        let mut decoder = crate::framing::FrameDecoder::new();
        decoder.extend(&position_stream(3));
        let mut count = 0;
        while decoder.next_message().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
    }
}
