//! Simulated vehicles for integration tests
//!
//! Each simulator serves links handed out by a `ChannelConnector` and replies
//! the way a PX4 SITL instance would, optionally misbehaving per script.

#![allow(dead_code)]

use std::time::Duration;

use mavgcs::config::{GcsConfig, LinkConfig, RelayConfig, UploadConfig};
use mavgcs::transports::ChannelTransport;
use mavgcs::{Transport, VehicleIdentity};
use mavlink::MavHeader;
use mavlink::common::{
    GLOBAL_POSITION_INT_DATA, HEARTBEAT_DATA, MISSION_ACK_DATA, MISSION_REQUEST_DATA, MISSION_REQUEST_INT_DATA,
    MavAutopilot, MavMessage, MavMissionResult, MavMissionType, MavModeFlag, MavState, MavType,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

pub const VEHICLE: VehicleIdentity = VehicleIdentity { system_id: 1, component_id: 1 };

/// Timeouts short enough for tests, long enough for a loaded CI runner
pub fn fast_config() -> GcsConfig {
    GcsConfig {
        link: LinkConfig { heartbeat_timeout: Duration::from_millis(500), ..LinkConfig::default() },
        relay: RelayConfig {
            idle_timeout: Duration::from_millis(150),
            reconnect_backoff: Duration::from_millis(20),
            ..RelayConfig::default()
        },
        upload: UploadConfig {
            step_timeout: Duration::from_millis(200),
            clear_settle_delay: Duration::from_millis(10),
            ..UploadConfig::default()
        },
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn header(sequence: u8) -> MavHeader {
    MavHeader { system_id: VEHICLE.system_id, component_id: VEHICLE.component_id, sequence }
}

pub fn vehicle_heartbeat() -> MavMessage {
    MavMessage::HEARTBEAT(HEARTBEAT_DATA {
        custom_mode: 0,
        mavtype: MavType::MAV_TYPE_QUADROTOR,
        autopilot: MavAutopilot::MAV_AUTOPILOT_PX4,
        base_mode: MavModeFlag::empty(),
        system_status: MavState::MAV_STATE_STANDBY,
        mavlink_version: 3,
    })
}

pub fn position(lat: i32, lon: i32, relative_alt: i32) -> MavMessage {
    MavMessage::GLOBAL_POSITION_INT(GLOBAL_POSITION_INT_DATA {
        time_boot_ms: 0,
        lat,
        lon,
        alt: 488_000 + relative_alt,
        relative_alt,
        vx: 0,
        vy: 0,
        vz: 0,
        hdg: 0,
    })
}

fn ack(code: MavMissionResult) -> MavMessage {
    MavMessage::MISSION_ACK(MISSION_ACK_DATA {
        target_system: 255,
        target_component: 190,
        mavtype: code,
        mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        opaque_id: 0,
    })
}

#[allow(deprecated)]
fn request(seq: u16, legacy: bool) -> MavMessage {
    if legacy {
        MavMessage::MISSION_REQUEST(MISSION_REQUEST_DATA {
            target_system: 255,
            target_component: 190,
            seq,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        })
    } else {
        MavMessage::MISSION_REQUEST_INT(MISSION_REQUEST_INT_DATA {
            target_system: 255,
            target_component: 190,
            seq,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        })
    }
}

/// How a simulated autopilot answers a mission upload
#[derive(Debug, Clone)]
pub struct MissionScript {
    /// Reply to MISSION_CLEAR_ALL, or stay silent
    pub clear_ack: Option<MavMissionResult>,
    /// Sequence numbers to request in order; `None` requests 0..count
    pub requests: Option<Vec<u16>>,
    /// Reply once every scripted request has been answered, or stay silent
    pub final_ack: Option<MavMissionResult>,
    /// Use the deprecated float MISSION_REQUEST
    pub legacy_requests: bool,
    /// Slip an ack in after the item with this sequence arrives
    pub ack_after_item: Option<(u16, MavMissionResult)>,
    /// Ask for the last item once more before the final ack
    pub repeat_last_request: bool,
}

impl Default for MissionScript {
    fn default() -> Self {
        Self {
            clear_ack: Some(MavMissionResult::MAV_MISSION_ACCEPTED),
            requests: None,
            final_ack: Some(MavMissionResult::MAV_MISSION_ACCEPTED),
            legacy_requests: false,
            ack_after_item: None,
            repeat_last_request: false,
        }
    }
}

/// Serve one mission upload link; resolves to every message the vehicle received
pub fn spawn_mission_vehicle(
    mut accepted: UnboundedReceiver<ChannelTransport>,
    script: MissionScript,
) -> JoinHandle<Vec<MavMessage>> {
    tokio::spawn(async move {
        match accepted.recv().await {
            Some(link) => serve_mission(link, script).await,
            None => Vec::new(),
        }
    })
}

async fn serve_mission(mut link: ChannelTransport, script: MissionScript) -> Vec<MavMessage> {
    let mut log = Vec::new();
    let mut sequence = 0u8;
    let mut plan: Vec<u16> = Vec::new();
    let mut next = 0usize;
    let mut count = 0u16;
    let mut repeated = false;

    while let Ok(received) = link.recv().await {
        log.push(received.message.clone());
        let mut replies = Vec::new();

        match &received.message {
            MavMessage::HEARTBEAT(data) if data.mavtype == MavType::MAV_TYPE_GCS => {
                replies.push(vehicle_heartbeat());
            }
            MavMessage::MISSION_CLEAR_ALL(_) => replies.extend(script.clear_ack.map(ack)),
            MavMessage::MISSION_COUNT(data) => {
                count = data.count;
                plan = script.requests.clone().unwrap_or_else(|| (0..count).collect());
                next = 0;
                repeated = false;
                request_next(&plan, &mut next, count, &script, &mut repeated, &mut replies);
            }
            MavMessage::MISSION_ITEM_INT(data) => {
                if let Some((seq, code)) = script.ack_after_item {
                    if data.seq == seq {
                        replies.push(ack(code));
                    }
                }
                request_next(&plan, &mut next, count, &script, &mut repeated, &mut replies);
            }
            _ => {}
        }

        for reply in replies {
            if link.send(header(sequence), &reply).await.is_err() {
                return log;
            }
            sequence = sequence.wrapping_add(1);
        }
    }
    log
}

/// Queue the next request, skipping past out-of-range ones that get no answer
fn request_next(
    plan: &[u16],
    next: &mut usize,
    count: u16,
    script: &MissionScript,
    repeated: &mut bool,
    replies: &mut Vec<MavMessage>,
) {
    while let Some(&seq) = plan.get(*next) {
        *next += 1;
        replies.push(request(seq, script.legacy_requests));
        if seq < count {
            return;
        }
    }
    if script.repeat_last_request && !*repeated && count > 0 {
        *repeated = true;
        replies.push(request(count - 1, script.legacy_requests));
        return;
    }
    replies.extend(script.final_ack.map(ack));
}

/// Serve every link: heartbeat, `fixes` positions, then silence until dropped
pub fn spawn_telemetry_vehicle(mut accepted: UnboundedReceiver<ChannelTransport>, fixes: usize) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(link) = accepted.recv().await {
            tokio::spawn(serve_telemetry(link, fixes));
        }
    })
}

async fn serve_telemetry(mut link: ChannelTransport, fixes: usize) {
    // Wait for the GCS to announce itself
    loop {
        match link.recv().await {
            Ok(received) if matches!(received.message, MavMessage::HEARTBEAT(_)) => break,
            Ok(_) => {}
            Err(_) => return,
        }
    }

    let mut outgoing = vec![vehicle_heartbeat()];
    outgoing.extend((0..fixes).map(|n| position(473977420 + n as i32, 85455940, 20000)));
    for (n, message) in outgoing.iter().enumerate() {
        if link.send(header(n as u8), message).await.is_err() {
            return;
        }
    }

    while link.recv().await.is_ok() {}
}
