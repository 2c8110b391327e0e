//! Mission commands and coordinate frames
//!
//! Both enums are closed: a raw id outside the table is rejected when a
//! mission source is parsed, never silently mapped to a default.

use mavlink::common::{MavCmd, MavFrame};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident($raw_ty:ty) => $mav:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $raw:literal => $mav_variant:ident, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every supported value, in table order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Look up a raw MAVLink id
            pub fn from_raw(raw: $raw_ty) -> Option<Self> {
                match raw {
                    $( $raw => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Raw MAVLink id
            pub fn raw(self) -> $raw_ty {
                match self {
                    $( $name::$variant => $raw, )+
                }
            }

            #[allow(deprecated)]
            pub fn to_mav(self) -> $mav {
                match self {
                    $( $name::$variant => $mav::$mav_variant, )+
                }
            }

            #[allow(deprecated)]
            pub fn from_mav(value: $mav) -> Option<Self> {
                match value {
                    $( $mav::$mav_variant => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// The MAVLink enum entry name
            pub fn mav_name(self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($mav_variant), )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.mav_name())
            }
        }
    };
}

wire_enum! {
    /// Coordinate frame of a mission item
    pub enum MissionFrame(u8) => MavFrame {
        /// Altitude above mean sea level
        Global = 0 => MAV_FRAME_GLOBAL,
        LocalNed = 1 => MAV_FRAME_LOCAL_NED,
        /// Not a coordinate frame; the item carries no position
        Mission = 2 => MAV_FRAME_MISSION,
        /// Altitude relative to home
        GlobalRelativeAlt = 3 => MAV_FRAME_GLOBAL_RELATIVE_ALT,
        LocalEnu = 4 => MAV_FRAME_LOCAL_ENU,
        /// Altitude above terrain
        GlobalTerrainAlt = 10 => MAV_FRAME_GLOBAL_TERRAIN_ALT,
    }
}

wire_enum! {
    /// Command carried by a mission item
    pub enum MissionCommand(u16) => MavCmd {
        NavWaypoint = 16 => MAV_CMD_NAV_WAYPOINT,
        NavLoiterUnlim = 17 => MAV_CMD_NAV_LOITER_UNLIM,
        NavLoiterTurns = 18 => MAV_CMD_NAV_LOITER_TURNS,
        NavLoiterTime = 19 => MAV_CMD_NAV_LOITER_TIME,
        NavReturnToLaunch = 20 => MAV_CMD_NAV_RETURN_TO_LAUNCH,
        NavLand = 21 => MAV_CMD_NAV_LAND,
        NavTakeoff = 22 => MAV_CMD_NAV_TAKEOFF,
        NavVtolTakeoff = 84 => MAV_CMD_NAV_VTOL_TAKEOFF,
        NavVtolLand = 85 => MAV_CMD_NAV_VTOL_LAND,
        NavDelay = 93 => MAV_CMD_NAV_DELAY,
        ConditionDelay = 112 => MAV_CMD_CONDITION_DELAY,
        DoJump = 177 => MAV_CMD_DO_JUMP,
        DoChangeSpeed = 178 => MAV_CMD_DO_CHANGE_SPEED,
        DoSetHome = 179 => MAV_CMD_DO_SET_HOME,
        DoSetRelay = 181 => MAV_CMD_DO_SET_RELAY,
        DoSetServo = 183 => MAV_CMD_DO_SET_SERVO,
        DoLandStart = 189 => MAV_CMD_DO_LAND_START,
        DoSetRoiLocation = 195 => MAV_CMD_DO_SET_ROI_LOCATION,
        DoSetRoiNone = 197 => MAV_CMD_DO_SET_ROI_NONE,
        DoDigicamControl = 203 => MAV_CMD_DO_DIGICAM_CONTROL,
        /// Survey camera trigger by distance
        DoSetCamTriggDist = 206 => MAV_CMD_DO_SET_CAM_TRIGG_DIST,
        DoSetCamTriggInterval = 214 => MAV_CMD_DO_SET_CAM_TRIGG_INTERVAL,
        SetCameraMode = 530 => MAV_CMD_SET_CAMERA_MODE,
        DoGimbalManagerPitchyaw = 1000 => MAV_CMD_DO_GIMBAL_MANAGER_PITCHYAW,
        ImageStartCapture = 2000 => MAV_CMD_IMAGE_START_CAPTURE,
        ImageStopCapture = 2001 => MAV_CMD_IMAGE_STOP_CAPTURE,
        VideoStartCapture = 2500 => MAV_CMD_VIDEO_START_CAPTURE,
        VideoStopCapture = 2501 => MAV_CMD_VIDEO_STOP_CAPTURE,
        DoVtolTransition = 3000 => MAV_CMD_DO_VTOL_TRANSITION,
    }
}
