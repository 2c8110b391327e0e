//! Waypoint sources

use std::path::{Path, PathBuf};
use tracing::info;

use super::command::{MissionCommand, MissionFrame};
use super::waypoint::{MissionList, Waypoint};
use super::{plan, wpl};
use crate::{GcsError, Result};

/// Anything that can produce a validated mission
pub trait WaypointSource {
    fn load(&self) -> Result<MissionList>;
}

/// A small square survey around a home position
#[derive(Debug, Clone, PartialEq)]
pub struct SquarePattern {
    pub home_latitude: f64,
    pub home_longitude: f64,
    /// Metres above home
    pub altitude: f64,
}

impl Default for SquarePattern {
    fn default() -> Self {
        // PX4 SITL default home
        Self { home_latitude: 47.397742, home_longitude: 8.545594, altitude: 20.0 }
    }
}

impl SquarePattern {
    /// Corner offset in degrees
    const SIDE_DEG: f64 = 0.001;

    /// Takeoff, three corners of the square, then return to launch
    pub fn waypoints(&self) -> Vec<Waypoint> {
        let frame = MissionFrame::GlobalRelativeAlt;
        let (lat, lon) = (self.home_latitude, self.home_longitude);
        let north = lat + Self::SIDE_DEG;
        let east = lon + Self::SIDE_DEG;

        let mut items = vec![
            Waypoint::new(MissionCommand::NavTakeoff, frame, lat, lon, self.altitude)
                .with_params([15.0, 0.0, 0.0, 0.0]),
        ];
        for (corner_lat, corner_lon) in [(north, lon), (north, east), (lat, east)] {
            items.push(Waypoint::new(MissionCommand::NavWaypoint, frame, corner_lat, corner_lon, self.altitude));
        }
        items.push(Waypoint::new(MissionCommand::NavReturnToLaunch, frame, 0.0, 0.0, 0.0));
        items
    }
}

impl WaypointSource for SquarePattern {
    fn load(&self) -> Result<MissionList> {
        let mission = MissionList::from_unsequenced(self.waypoints())?;
        info!("Generated square pattern with {} items", mission.len());
        Ok(mission)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    /// QGroundControl JSON
    Plan,
    /// QGC WPL 110 text
    Wpl,
}

/// A mission file on disk, `.plan` or `.txt`
#[derive(Debug, Clone)]
pub struct MissionFile {
    path: PathBuf,
}

impl MissionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> Result<FileFormat> {
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("plan") => Ok(FileFormat::Plan),
            Some("txt") => Ok(FileFormat::Wpl),
            _ => Err(GcsError::malformed(
                self.path.display().to_string(),
                "unknown mission file format, use .plan or .txt",
            )),
        }
    }
}

impl WaypointSource for MissionFile {
    fn load(&self) -> Result<MissionList> {
        let format = self.format()?;
        let text = std::fs::read_to_string(&self.path).map_err(|e| GcsError::file_error(self.path.clone(), e))?;
        let origin = self.path.display().to_string();

        let mission = match format {
            FileFormat::Plan => plan::parse(&origin, &text)?,
            FileFormat::Wpl => wpl::parse(&origin, &text)?,
        };
        info!("Loaded {} mission items from {}", mission.len(), origin);
        Ok(mission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mission_fixture;

    #[test]
    fn square_pattern_matches_reference_mission() {
        let mission = SquarePattern::default().load().unwrap();
        assert_eq!(mission.len(), 5);

        let takeoff = &mission.items()[0];
        assert_eq!(takeoff.command, MissionCommand::NavTakeoff);
        assert!(takeoff.is_current);
        assert_eq!(takeoff.params[0], 15.0);
        assert_eq!((takeoff.latitude, takeoff.longitude, takeoff.altitude), (47.397742, 8.545594, 20.0));

        let corners: Vec<_> = mission.items()[1..4].iter().map(|w| (w.latitude, w.longitude)).collect();
        let expected = [(47.398742, 8.545594), (47.398742, 8.546594), (47.397742, 8.546594)];
        for ((lat, lon), (want_lat, want_lon)) in corners.iter().zip(expected) {
            assert!((lat - want_lat).abs() < 1e-9 && (lon - want_lon).abs() < 1e-9);
        }

        let rtl = &mission.items()[4];
        assert_eq!(rtl.command, MissionCommand::NavReturnToLaunch);
        assert_eq!((rtl.latitude, rtl.longitude, rtl.altitude), (0.0, 0.0, 0.0));
        assert!(mission.iter().all(|w| w.frame == MissionFrame::GlobalRelativeAlt && w.auto_continue));
    }

    #[test]
    fn unknown_extension_is_malformed() {
        let err = MissionFile::new("mission.kml").load().unwrap_err();
        assert!(matches!(err, GcsError::MalformedSource { .. }));
    }

    #[test]
    fn missing_file_is_a_file_error() {
        let err = MissionFile::new("/nonexistent/mission.plan").load().unwrap_err();
        assert!(matches!(err, GcsError::File { .. }));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let path = mission_fixture("simple.txt").unwrap();
        let upper = path.with_file_name("SIMPLE.TXT");
        assert_eq!(MissionFile::new(upper).format().unwrap(), FileFormat::Wpl);
        assert_eq!(MissionFile::new(path).load().unwrap().len(), 4);
    }
}
