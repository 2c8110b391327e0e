//! QGroundControl `.plan` decoding
//!
//! Only `mission.items` is read. Simple items become one waypoint each;
//! survey-style complex items contribute their generated sub-items.

use serde::Deserialize;
use serde_json::Value;

use super::command::{MissionCommand, MissionFrame};
use super::waypoint::{MissionList, Waypoint};
use crate::{GcsError, Result};

const DEFAULT_FRAME: u8 = 3;
const DEFAULT_COMMAND: u16 = 16;
const PARAM_COUNT: usize = 7;

#[derive(Debug, Default, Deserialize)]
struct PlanDocument {
    #[serde(default)]
    mission: PlanMission,
}

#[derive(Debug, Default, Deserialize)]
struct PlanMission {
    #[serde(default)]
    items: Vec<PlanItem>,
}

#[derive(Debug, Deserialize)]
struct PlanItem {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    frame: Option<u8>,
    #[serde(default)]
    command: Option<u16>,
    #[serde(rename = "autoContinue", default)]
    auto_continue: Option<bool>,
    #[serde(default)]
    params: Value,
    #[serde(rename = "TransectStyleComplexItem", default)]
    transect: Option<TransectStyle>,
}

#[derive(Debug, Default, Deserialize)]
struct TransectStyle {
    #[serde(rename = "Items", default)]
    items: Vec<PlanItem>,
}

/// Decode `.plan` JSON text; `origin` names the source in errors
pub fn parse(origin: &str, text: &str) -> Result<MissionList> {
    let document: PlanDocument =
        serde_json::from_str(text).map_err(|e| GcsError::malformed(origin, format!("invalid JSON: {e}")))?;

    let mut waypoints = Vec::new();
    for item in &document.mission.items {
        match item.kind.as_deref() {
            Some("SimpleItem") => waypoints.push(to_waypoint(origin, item)?),
            Some("ComplexItem") => {
                if let Some(transect) = &item.transect {
                    for sub_item in &transect.items {
                        waypoints.push(to_waypoint(origin, sub_item)?);
                    }
                }
            }
            _ => {}
        }
    }

    MissionList::from_unsequenced(waypoints)
}

fn to_waypoint(origin: &str, item: &PlanItem) -> Result<Waypoint> {
    let raw_frame = item.frame.unwrap_or(DEFAULT_FRAME);
    let raw_command = item.command.unwrap_or(DEFAULT_COMMAND);
    let frame = MissionFrame::from_raw(raw_frame)
        .ok_or_else(|| GcsError::malformed(origin, format!("unsupported frame {raw_frame}")))?;
    let command = MissionCommand::from_raw(raw_command)
        .ok_or_else(|| GcsError::malformed(origin, format!("unsupported command {raw_command}")))?;

    let p = params(origin, &item.params)?;
    let mut waypoint = Waypoint::new(command, frame, p[4], p[5], p[6]).with_params([p[0], p[1], p[2], p[3]]);
    waypoint.auto_continue = item.auto_continue.unwrap_or(true);
    Ok(waypoint)
}

/// Seven params, nulls as zero, short arrays padded
fn params(origin: &str, raw: &Value) -> Result<[f64; PARAM_COUNT]> {
    let mut params = [0.0; PARAM_COUNT];
    let Value::Array(values) = raw else {
        return Ok(params);
    };
    for (slot, value) in params.iter_mut().zip(values) {
        *slot = match value {
            Value::Null => 0.0,
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| GcsError::malformed(origin, format!("parameter {n} out of range")))?,
            other => return Err(GcsError::malformed(origin, format!("non-numeric parameter {other}"))),
        };
    }
    Ok(params)
}
