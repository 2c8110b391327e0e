//! Mission Transfer Engine: the MAVLink mission upload handshake
//!
//! One call to [`MissionUploader::upload`] is one attempt. The sequence is
//! clear → count → item requests → final acknowledgement, every step bounded
//! by the configured step timeout. Any failure ends the attempt with a
//! terminal [`UploadResult`]; nothing is retried internally.

use mavlink::common::{
    MISSION_CLEAR_ALL_DATA, MISSION_COUNT_DATA, MavMessage, MavMissionResult, MavMissionType,
};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::waypoint::MissionList;
use crate::config::UploadConfig;
use crate::session::{ConnectionState, LinkSession, VehicleIdentity};
use crate::{GcsError, Result};

/// Handshake step that ran out of time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    Heartbeat,
    ClearAck,
    ItemRequest,
    FinalAck,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandshakeStep::Heartbeat => "vehicle heartbeat",
            HandshakeStep::ClearAck => "mission clear acknowledgement",
            HandshakeStep::ItemRequest => "mission item request",
            HandshakeStep::FinalAck => "final mission acknowledgement",
        })
    }
}

/// Why an attempt stopped without a vehicle verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    EmptyMission,
    LinkLost,
    RequestBudgetExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UploadOutcome {
    Accepted,
    Rejected(MavMissionResult),
    TimedOut(HandshakeStep),
    Aborted(AbortReason),
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadOutcome::Accepted => f.write_str("accepted"),
            UploadOutcome::Rejected(code) => write!(f, "rejected ({code:?})"),
            UploadOutcome::TimedOut(step) => write!(f, "timed out waiting for {step}"),
            UploadOutcome::Aborted(AbortReason::EmptyMission) => f.write_str("aborted: empty mission"),
            UploadOutcome::Aborted(AbortReason::LinkLost) => f.write_str("aborted: link lost"),
            UploadOutcome::Aborted(AbortReason::RequestBudgetExhausted) => {
                f.write_str("aborted: vehicle exceeded the request budget")
            }
        }
    }
}

/// Terminal result of one upload attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadResult {
    pub outcome: UploadOutcome,
    /// Distinct items sent in answer to a request
    pub items_acknowledged: u32,
}

impl UploadResult {
    fn new(outcome: UploadOutcome, items_acknowledged: u32) -> Self {
        Self { outcome, items_acknowledged }
    }

    pub fn is_accepted(&self) -> bool {
        self.outcome == UploadOutcome::Accepted
    }

    /// Convert to an error for `?` callers; `step_timeout` fills timeout errors
    pub fn into_result(self, step_timeout: Duration) -> Result<u32> {
        match self.outcome {
            UploadOutcome::Accepted => Ok(self.items_acknowledged),
            UploadOutcome::Rejected(code) => Err(GcsError::ProtocolRejected { code: format!("{code:?}") }),
            UploadOutcome::TimedOut(step) => {
                Err(GcsError::ProtocolTimeout { step: step.to_string(), duration: step_timeout })
            }
            UploadOutcome::Aborted(AbortReason::EmptyMission) => {
                Err(GcsError::malformed("mission", "no mission items to upload"))
            }
            UploadOutcome::Aborted(AbortReason::LinkLost) => {
                Err(GcsError::link_lost(format!("link lost after {} items", self.items_acknowledged)))
            }
            UploadOutcome::Aborted(AbortReason::RequestBudgetExhausted) => Err(GcsError::ProtocolRejected {
                code: "vehicle exceeded the request budget".to_string(),
            }),
        }
    }
}

impl fmt::Display for UploadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} items acknowledged)", self.outcome, self.items_acknowledged)
    }
}

/// Vehicle replies the handshake reacts to
enum Reply {
    Request(u16),
    Ack(MavMissionResult),
}

#[allow(deprecated)]
fn classify(message: &MavMessage) -> Option<Reply> {
    match message {
        MavMessage::MISSION_REQUEST_INT(data) if is_mission(data.mission_type) => Some(Reply::Request(data.seq)),
        MavMessage::MISSION_REQUEST(data) if is_mission(data.mission_type) => Some(Reply::Request(data.seq)),
        MavMessage::MISSION_ACK(data) if is_mission(data.mission_type) => Some(Reply::Ack(data.mavtype)),
        _ => None,
    }
}

fn is_mission(kind: MavMissionType) -> bool {
    kind == MavMissionType::MAV_MISSION_TYPE_MISSION
}

/// Uploads missions over an exclusively owned session
pub struct MissionUploader {
    session: LinkSession,
    config: UploadConfig,
}

impl MissionUploader {
    pub fn new(session: LinkSession, config: UploadConfig) -> Self {
        Self { session, config }
    }

    /// Run one upload attempt; the session is closed afterwards
    pub async fn upload(&mut self, mission: &MissionList) -> UploadResult {
        let result = self.attempt(mission).await;
        self.session.close().await;
        if result.is_accepted() {
            info!("Mission upload successful: {} items", result.items_acknowledged);
        } else {
            warn!("Mission upload failed: {}", result);
        }
        result
    }

    async fn attempt(&mut self, mission: &MissionList) -> UploadResult {
        if mission.is_empty() {
            warn!("No mission items to upload");
            return UploadResult::new(UploadOutcome::Aborted(AbortReason::EmptyMission), 0);
        }
        let count = mission.len();

        if self.session.connect().await != ConnectionState::Connected {
            return UploadResult::new(UploadOutcome::TimedOut(HandshakeStep::Heartbeat), 0);
        }
        let Some(target) = self.session.vehicle() else {
            return UploadResult::new(UploadOutcome::TimedOut(HandshakeStep::Heartbeat), 0);
        };

        info!("Clearing existing mission on system {}", target.system_id);
        let clear = MavMessage::MISSION_CLEAR_ALL(MISSION_CLEAR_ALL_DATA {
            target_system: target.system_id,
            target_component: target.component_id,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
        });
        if self.session.send(&clear).await.is_err() {
            return UploadResult::new(UploadOutcome::Aborted(AbortReason::LinkLost), 0);
        }

        match self.await_ack().await {
            Ok(Some(MavMissionResult::MAV_MISSION_ACCEPTED)) => debug!("Clear acknowledged"),
            Ok(Some(code)) => return UploadResult::new(UploadOutcome::Rejected(code), 0),
            Ok(None) => {
                warn!("No MISSION_ACK after clearing mission");
                return UploadResult::new(UploadOutcome::TimedOut(HandshakeStep::ClearAck), 0);
            }
            Err(_) => return UploadResult::new(UploadOutcome::Aborted(AbortReason::LinkLost), 0),
        }

        tokio::time::sleep(self.config.clear_settle_delay).await;

        info!("Starting mission upload of {} items", count);
        let announce = MavMessage::MISSION_COUNT(MISSION_COUNT_DATA {
            target_system: target.system_id,
            target_component: target.component_id,
            count: count as u16,
            mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
            opaque_id: 0,
        });
        if self.session.send(&announce).await.is_err() {
            return UploadResult::new(UploadOutcome::Aborted(AbortReason::LinkLost), 0);
        }

        let mut transfer = ItemTransfer {
            sent: vec![false; count],
            distinct: 0,
            requests: 0,
            budget: (count as u64) * u64::from(self.config.max_requests_per_item.max(1)),
        };

        while (transfer.distinct as usize) < count {
            let reply = match self.next_reply().await {
                Ok(Some(reply)) => reply,
                Ok(None) => {
                    warn!("No MISSION_REQUEST received from vehicle");
                    return transfer.finish(UploadOutcome::TimedOut(HandshakeStep::ItemRequest));
                }
                Err(_) => return transfer.finish(UploadOutcome::Aborted(AbortReason::LinkLost)),
            };

            match reply {
                Reply::Request(seq) => {
                    if let Err(outcome) = self.answer_request(mission, target, seq, &mut transfer).await {
                        return transfer.finish(outcome);
                    }
                }
                Reply::Ack(MavMissionResult::MAV_MISSION_ACCEPTED) => {
                    debug!("Ignoring stale MISSION_ACK during item transfer");
                }
                Reply::Ack(code) => {
                    warn!("Vehicle aborted the transfer with {:?}", code);
                    return transfer.finish(UploadOutcome::Rejected(code));
                }
            }
        }

        loop {
            let reply = match self.next_reply().await {
                Ok(Some(reply)) => reply,
                Ok(None) => {
                    warn!("No final MISSION_ACK received");
                    return transfer.finish(UploadOutcome::TimedOut(HandshakeStep::FinalAck));
                }
                Err(_) => return transfer.finish(UploadOutcome::Aborted(AbortReason::LinkLost)),
            };

            match reply {
                Reply::Ack(MavMissionResult::MAV_MISSION_ACCEPTED) => {
                    return transfer.finish(UploadOutcome::Accepted);
                }
                Reply::Ack(code) => return transfer.finish(UploadOutcome::Rejected(code)),
                // The last item may have been lost; answer and keep waiting
                Reply::Request(seq) => {
                    if let Err(outcome) = self.answer_request(mission, target, seq, &mut transfer).await {
                        return transfer.finish(outcome);
                    }
                }
            }
        }
    }

    async fn answer_request(
        &mut self,
        mission: &MissionList,
        target: VehicleIdentity,
        seq: u16,
        transfer: &mut ItemTransfer,
    ) -> std::result::Result<(), UploadOutcome> {
        transfer.requests += 1;
        if transfer.requests > transfer.budget {
            warn!("Vehicle sent {} requests for {} items, giving up", transfer.requests, mission.len());
            return Err(UploadOutcome::Aborted(AbortReason::RequestBudgetExhausted));
        }

        let index = usize::from(seq);
        let Some(item) = mission.get(index) else {
            warn!("Vehicle requested sequence {}, which is out of bounds", seq);
            return Ok(());
        };

        debug!("Vehicle requests waypoint {}", seq);
        let message = MavMessage::MISSION_ITEM_INT(item.to_mission_item_int(target));
        if self.session.send(&message).await.is_err() {
            return Err(UploadOutcome::Aborted(AbortReason::LinkLost));
        }
        if !transfer.sent[index] {
            transfer.sent[index] = true;
            transfer.distinct += 1;
        }
        Ok(())
    }

    async fn next_reply(&mut self) -> Result<Option<Reply>> {
        let received = self
            .session
            .receive_matching(|message| classify(message).is_some(), self.config.step_timeout)
            .await?;
        Ok(received.and_then(|received| classify(&received.message)))
    }

    async fn await_ack(&mut self) -> Result<Option<MavMissionResult>> {
        let received = self
            .session
            .receive_matching(|message| matches!(classify(message), Some(Reply::Ack(_))), self.config.step_timeout)
            .await?;
        Ok(received.and_then(|received| match classify(&received.message) {
            Some(Reply::Ack(code)) => Some(code),
            _ => None,
        }))
    }
}

/// Progress through the item phase
struct ItemTransfer {
    sent: Vec<bool>,
    distinct: u32,
    requests: u64,
    budget: u64,
}

impl ItemTransfer {
    fn finish(&self, outcome: UploadOutcome) -> UploadResult {
        UploadResult::new(outcome, self.distinct)
    }
}
