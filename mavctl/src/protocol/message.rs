//! Inbound messages.
//!
//! Only the handful of MAVLink messages the controller reacts to are represented here. Anything
//! else is dropped by the transport.

use std::fmt::{Display, Formatter};

use crate::protocol::MAV_MODE_FLAG_SAFETY_ARMED;

/// MAVLink system and component id of a remote party.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Target {
    /// MAVLink system id.
    pub system_id: u8,
    /// MAVLink component id.
    pub component_id: u8,
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.system_id, self.component_id)
    }
}

/// Kinds of inbound messages.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `HEARTBEAT`
    Heartbeat,
    /// `COMMAND_ACK`
    CommandAck,
    /// `GLOBAL_POSITION_INT`
    GlobalPositionInt,
    /// `VFR_HUD`
    VfrHud,
    /// `SYS_STATUS`
    SysStatus,
}

/// Inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// `HEARTBEAT`
    Heartbeat(Heartbeat),
    /// `COMMAND_ACK`
    CommandAck(CommandAck),
    /// `GLOBAL_POSITION_INT`
    GlobalPositionInt(GlobalPositionInt),
    /// `VFR_HUD`
    VfrHud(VfrHud),
    /// `SYS_STATUS`
    SysStatus(SysStatus),
}

impl Message {
    /// Kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Heartbeat(_) => MessageKind::Heartbeat,
            Message::CommandAck(_) => MessageKind::CommandAck,
            Message::GlobalPositionInt(_) => MessageKind::GlobalPositionInt,
            Message::VfrHud(_) => MessageKind::VfrHud,
            Message::SysStatus(_) => MessageKind::SysStatus,
        }
    }
}

/// `HEARTBEAT` message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Heartbeat {
    /// Sender of the heartbeat, taken from the frame header.
    pub source: Target,
    /// Vehicle type (`MAV_TYPE`).
    pub vehicle_type: u8,
    /// Autopilot type (`MAV_AUTOPILOT`).
    pub autopilot: u8,
    /// System mode bitmap (`MAV_MODE_FLAG`).
    pub base_mode: u8,
    /// Autopilot-specific mode.
    pub custom_mode: u32,
    /// System status (`MAV_STATE`).
    pub system_status: u8,
}

impl Heartbeat {
    /// Returns `true` if vehicle reports armed motors.
    pub fn is_armed(&self) -> bool {
        self.base_mode & MAV_MODE_FLAG_SAFETY_ARMED != 0
    }
}

/// `COMMAND_ACK` message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CommandAck {
    /// Acknowledged command code (`MAV_CMD`).
    pub command: u16,
    /// Result of the command.
    pub result: MavResult,
}

/// `GLOBAL_POSITION_INT` message in raw wire units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalPositionInt {
    /// Latitude, degE7.
    pub lat: i32,
    /// Longitude, degE7.
    pub lon: i32,
    /// Altitude (MSL), millimeters.
    pub alt: i32,
    /// Altitude above home, millimeters.
    pub relative_alt: i32,
}

impl GlobalPositionInt {
    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.lat as f64 / 1e7
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.lon as f64 / 1e7
    }

    /// Altitude (MSL) in meters.
    pub fn altitude(&self) -> f64 {
        self.alt as f64 / 1000.0
    }
}

/// `VFR_HUD` message.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VfrHud {
    /// Air speed, m/s.
    pub airspeed: f32,
    /// Ground speed, m/s.
    pub groundspeed: f32,
}

/// `SYS_STATUS` message.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SysStatus {
    /// Remaining battery energy in percent, `-1` if unknown.
    pub battery_remaining: i8,
}

/// Result of a command (`MAV_RESULT`).
///
/// This is an open enumeration: codes unknown to this crate are kept as [`MavResult::Other`]
/// and treated as failures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MavResult {
    /// Command is valid and was executed.
    Accepted,
    /// Command is valid but can't be executed at this time.
    TemporarilyRejected,
    /// Command is invalid.
    Denied,
    /// Command is not supported.
    Unsupported,
    /// Command is valid but execution has failed.
    Failed,
    /// Command is being executed.
    InProgress,
    /// Command has been cancelled.
    Cancelled,
    /// Any other result code.
    Other(u8),
}

impl MavResult {
    /// Returns `true` only for [`MavResult::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, MavResult::Accepted)
    }
}

impl From<u8> for MavResult {
    fn from(value: u8) -> Self {
        match value {
            0 => MavResult::Accepted,
            1 => MavResult::TemporarilyRejected,
            2 => MavResult::Denied,
            3 => MavResult::Unsupported,
            4 => MavResult::Failed,
            5 => MavResult::InProgress,
            6 => MavResult::Cancelled,
            code => MavResult::Other(code),
        }
    }
}

impl From<MavResult> for u8 {
    fn from(value: MavResult) -> Self {
        match value {
            MavResult::Accepted => 0,
            MavResult::TemporarilyRejected => 1,
            MavResult::Denied => 2,
            MavResult::Unsupported => 3,
            MavResult::Failed => 4,
            MavResult::InProgress => 5,
            MavResult::Cancelled => 6,
            MavResult::Other(code) => code,
        }
    }
}

impl Display for MavResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MavResult::Accepted => f.write_str("ACCEPTED"),
            MavResult::TemporarilyRejected => f.write_str("TEMPORARILY_REJECTED"),
            MavResult::Denied => f.write_str("DENIED"),
            MavResult::Unsupported => f.write_str("UNSUPPORTED"),
            MavResult::Failed => f.write_str("FAILED"),
            MavResult::InProgress => f.write_str("IN_PROGRESS"),
            MavResult::Cancelled => f.write_str("CANCELLED"),
            MavResult::Other(code) => write!(f, "result code {code}"),
        }
    }
}
