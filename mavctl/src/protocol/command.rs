//! Outbound commands.

use std::fmt::{Display, Formatter};

use mavio::dialects::common::enums::{MavCmd, MavModeFlag};

use crate::protocol::Target;

/// `MAV_CMD_NAV_LAND`
pub const MAV_CMD_NAV_LAND: u16 = MavCmd::NavLand as u16;
/// `MAV_CMD_NAV_TAKEOFF`
pub const MAV_CMD_NAV_TAKEOFF: u16 = MavCmd::NavTakeoff as u16;
/// `MAV_CMD_DO_SET_MODE`
pub const MAV_CMD_DO_SET_MODE: u16 = MavCmd::DoSetMode as u16;
/// `MAV_CMD_COMPONENT_ARM_DISARM`
pub const MAV_CMD_COMPONENT_ARM_DISARM: u16 = MavCmd::ComponentArmDisarm as u16;

/// `MAV_MODE_FLAG_CUSTOM_MODE_ENABLED`
pub const MAV_MODE_FLAG_CUSTOM_MODE_ENABLED: u8 = MavModeFlag::CUSTOM_MODE_ENABLED.bits();
/// `MAV_MODE_FLAG_SAFETY_ARMED`
pub const MAV_MODE_FLAG_SAFETY_ARMED: u8 = MavModeFlag::SAFETY_ARMED.bits();

/// Kind of command issued to a vehicle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Enable motors.
    Arm,
    /// Disable motors.
    Disarm,
    /// Change flight mode.
    SetMode,
    /// Take off to altitude.
    Takeoff,
    /// Land at the current position.
    Land,
}

impl CommandKind {
    /// MAVLink command code (`MAV_CMD`) of this kind.
    ///
    /// Arming and disarming share the same code and differ by the first parameter.
    pub fn code(&self) -> u16 {
        match self {
            CommandKind::Arm | CommandKind::Disarm => MAV_CMD_COMPONENT_ARM_DISARM,
            CommandKind::SetMode => MAV_CMD_DO_SET_MODE,
            CommandKind::Takeoff => MAV_CMD_NAV_TAKEOFF,
            CommandKind::Land => MAV_CMD_NAV_LAND,
        }
    }
}

impl Display for CommandKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CommandKind::Arm => "ARM",
            CommandKind::Disarm => "DISARM",
            CommandKind::SetMode => "SET_MODE",
            CommandKind::Takeoff => "TAKEOFF",
            CommandKind::Land => "LAND",
        };
        f.write_str(name)
    }
}

/// Command descriptor.
///
/// Immutable once constructed. Encoded into [`CommandLong`] for a particular [`Target`] right
/// before sending.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command {
    /// Arm motors.
    Arm,
    /// Disarm motors.
    Disarm,
    /// Switch to a custom flight mode.
    SetMode {
        /// Custom mode id from the vehicle [`ModeTable`](crate::protocol::ModeTable).
        mode_id: u32,
    },
    /// Take off from the specified position.
    Takeoff {
        /// Latitude, degrees.
        latitude: f64,
        /// Longitude, degrees.
        longitude: f64,
        /// Target altitude, meters.
        altitude: f64,
    },
}

impl Command {
    /// Command kind.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Arm => CommandKind::Arm,
            Command::Disarm => CommandKind::Disarm,
            Command::SetMode { .. } => CommandKind::SetMode,
            Command::Takeoff { .. } => CommandKind::Takeoff,
        }
    }

    /// Encodes command as `COMMAND_LONG` addressed to `target`.
    pub fn encode(&self, target: Target) -> CommandLong {
        let params = match *self {
            Command::Arm => [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            Command::Disarm => [0.0; 7],
            Command::SetMode { mode_id } => [
                MAV_MODE_FLAG_CUSTOM_MODE_ENABLED as f32,
                mode_id as f32,
                0.0,
                0.0,
                0.0,
                0.0,
                0.0,
            ],
            Command::Takeoff {
                latitude,
                longitude,
                altitude,
            } => [
                0.0,
                0.0,
                0.0,
                0.0,
                latitude as f32,
                longitude as f32,
                altitude as f32,
            ],
        };

        CommandLong {
            target_system: target.system_id,
            target_component: target.component_id,
            command: self.kind().code(),
            confirmation: 0,
            params,
        }
    }
}

/// Wire shape of MAVLink `COMMAND_LONG`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CommandLong {
    /// Target system id.
    pub target_system: u8,
    /// Target component id.
    pub target_component: u8,
    /// Command code (`MAV_CMD`).
    pub command: u16,
    /// Confirmation counter, always `0` for the first transmission.
    pub confirmation: u8,
    /// Parameters `param1` to `param7`.
    pub params: [f32; 7],
}

impl CommandLong {
    /// Returns parameter by its MAVLink number (`1..=7`).
    pub fn param(&self, n: usize) -> Option<f32> {
        n.checked_sub(1).and_then(|idx| self.params.get(idx).copied())
    }
}
