//! Missions: the waypoint model, where missions come from, and how they
//! are transferred to a vehicle

pub mod command;
pub mod plan;
pub mod source;
pub mod transfer;
pub mod waypoint;
pub mod wpl;

pub use command::{MissionCommand, MissionFrame};
pub use source::{MissionFile, SquarePattern, WaypointSource};
pub use transfer::{AbortReason, HandshakeStep, MissionUploader, UploadOutcome, UploadResult};
pub use waypoint::{MissionList, Waypoint};
