//! Waypoints and validated mission lists

use mavlink::common::{MISSION_ITEM_INT_DATA, MavMissionType};
use serde::{Deserialize, Serialize};

use super::command::{MissionCommand, MissionFrame};
use crate::session::VehicleIdentity;
use crate::{GcsError, Result};

/// Highest item count the 16-bit MAVLink mission sequence can address
pub const MAX_MISSION_ITEMS: usize = u16::MAX as usize;

/// One mission item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub sequence: u32,
    pub frame: MissionFrame,
    pub command: MissionCommand,
    pub is_current: bool,
    pub auto_continue: bool,
    /// param1..param4, meaning depends on the command
    pub params: [f64; 4],
    /// Degrees (or metres in local frames)
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl Waypoint {
    /// An unsequenced item with zero params and auto-continue on
    pub fn new(command: MissionCommand, frame: MissionFrame, latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            sequence: 0,
            frame,
            command,
            is_current: false,
            auto_continue: true,
            params: [0.0; 4],
            latitude,
            longitude,
            altitude,
        }
    }

    pub fn with_params(mut self, params: [f64; 4]) -> Self {
        self.params = params;
        self
    }

    /// Encode as `MISSION_ITEM_INT` addressed to `target`
    ///
    /// Coordinates become degrees × 1e7, rounded to the nearest integer.
    pub fn to_mission_item_int(&self, target: VehicleIdentity) -> MISSION_ITEM_INT_DATA {
        MISSION_ITEM_INT_DATA {
            target_system: target.system_id,
            target_component: target.component_id,
            seq: self.sequence as u16,
            frame: self.frame.to_mav(),
            command: self.command.to_mav(),
            current: u8::from(self.is_current),
            autocontinue: u8::from(self.auto_continue),
            param1: self.params[0] as f32,
            param2: self.params[1] as f32,
            param3: self.params[2] as f32,
            param4: self.params[3] as f32,
            x: scale_coordinate(self.latitude),
            y: scale_coordinate(self.longitude),
            z: self.altitude as f32,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        }
    }

    /// Decode a `MISSION_ITEM_INT` payload
    pub fn from_mission_item_int(data: &MISSION_ITEM_INT_DATA) -> Result<Self> {
        let frame = MissionFrame::from_mav(data.frame)
            .ok_or_else(|| GcsError::malformed("MISSION_ITEM_INT", format!("unsupported frame {:?}", data.frame)))?;
        let command = MissionCommand::from_mav(data.command)
            .ok_or_else(|| GcsError::malformed("MISSION_ITEM_INT", format!("unsupported command {:?}", data.command)))?;
        Ok(Self {
            sequence: u32::from(data.seq),
            frame,
            command,
            is_current: data.current != 0,
            auto_continue: data.autocontinue != 0,
            params: [data.param1, data.param2, data.param3, data.param4].map(f64::from),
            latitude: f64::from(data.x) / 1e7,
            longitude: f64::from(data.y) / 1e7,
            altitude: f64::from(data.z),
        })
    }
}

fn scale_coordinate(degrees: f64) -> i32 {
    // `as` saturates on overflow and maps NaN to 0
    (degrees * 1e7).round() as i32
}

/// An ordered mission whose sequence numbers are known to be valid
///
/// Sequences run contiguously from 0 and only item 0 is current.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MissionList {
    items: Vec<Waypoint>,
}

impl MissionList {
    /// Validate explicitly sequenced items
    pub fn new(items: Vec<Waypoint>) -> Result<Self> {
        check_len(items.len())?;
        for (index, item) in items.iter().enumerate() {
            if item.sequence as usize != index {
                return Err(GcsError::malformed(
                    "mission list",
                    format!("item at position {index} has sequence {}", item.sequence),
                ));
            }
            if item.is_current != (index == 0) {
                return Err(GcsError::malformed(
                    "mission list",
                    format!("only item 0 may be current (item {index} current={})", item.is_current),
                ));
            }
        }
        Ok(Self { items })
    }

    /// Re-sequence from 0 and mark only the first item current
    pub fn from_unsequenced(mut items: Vec<Waypoint>) -> Result<Self> {
        check_len(items.len())?;
        for (index, item) in items.iter_mut().enumerate() {
            item.sequence = index as u32;
            item.is_current = index == 0;
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item by sequence number
    pub fn get(&self, sequence: usize) -> Option<&Waypoint> {
        self.items.get(sequence)
    }

    pub fn items(&self) -> &[Waypoint] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Waypoint> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a MissionList {
    type Item = &'a Waypoint;
    type IntoIter = std::slice::Iter<'a, Waypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn check_len(len: usize) -> Result<()> {
    if len > MAX_MISSION_ITEMS {
        return Err(GcsError::malformed(
            "mission list",
            format!("{len} items exceed the MAVLink limit of {MAX_MISSION_ITEMS}"),
        ));
    }
    Ok(())
}
