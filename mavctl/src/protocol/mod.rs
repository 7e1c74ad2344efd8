//! MAVLink protocol entities.
//!
//! Typed views of the few MAVLink messages and commands the controller uses. Wire encoding lives
//! in the [`mavlink`](crate::io::mavlink) transport, the rest of the crate only sees these
//! types.

mod command;
mod message;
mod mode;

pub use command::{Command, CommandKind, CommandLong};
pub use command::{
    MAV_CMD_COMPONENT_ARM_DISARM, MAV_CMD_DO_SET_MODE, MAV_CMD_NAV_LAND, MAV_CMD_NAV_TAKEOFF,
    MAV_MODE_FLAG_CUSTOM_MODE_ENABLED, MAV_MODE_FLAG_SAFETY_ARMED,
};
pub use message::{
    CommandAck, GlobalPositionInt, Heartbeat, MavResult, Message, MessageKind, SysStatus, Target,
    VfrHud,
};
pub use mode::{ModeTable, MAV_AUTOPILOT_ARDUPILOTMEGA, MAV_AUTOPILOT_INVALID};
