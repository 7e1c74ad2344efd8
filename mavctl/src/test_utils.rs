//! # Test utilities
//!
//! A [`ScriptedTransport`] which replays a queue of inbound messages and records everything sent
//! through it. Used to exercise sessions and flight operations without a vehicle.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use mavctl::protocol::{CommandKind, MavResult};
//! use mavctl::session::Session;
//! use mavctl::test_utils::ScriptedTransport;
//!
//! let transport = ScriptedTransport::new()
//!     .with_heartbeat()
//!     .then_position(520000000, 130000000, 100000)
//!     .then_ack(CommandKind::Takeoff, MavResult::Accepted);
//! let journal = transport.journal();
//!
//! let session = Session::builder()
//!     .poll_interval(Duration::from_millis(10))
//!     .with_transport(transport)
//!     .unwrap();
//! session.takeoff(10.0).unwrap();
//!
//! assert_eq!(journal.commands().len(), 3);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use mavio::dialects::common::enums::{MavState, MavType};

use crate::io::Transport;
use crate::protocol::{
    CommandAck, CommandKind, CommandLong, GlobalPositionInt, Heartbeat, MavResult, Message,
    MessageKind, ModeTable, Target, MAV_AUTOPILOT_ARDUPILOTMEGA, MAV_AUTOPILOT_INVALID,
    MAV_CMD_COMPONENT_ARM_DISARM, MAV_MODE_FLAG_CUSTOM_MODE_ENABLED, MAV_MODE_FLAG_SAFETY_ARMED,
};

use crate::prelude::*;

/// Heartbeat of an ArduCopter quadrotor sent by [`ScriptedTransport::VEHICLE`].
pub fn heartbeat(armed: bool) -> Heartbeat {
    let mut base_mode = MAV_MODE_FLAG_CUSTOM_MODE_ENABLED;
    if armed {
        base_mode |= MAV_MODE_FLAG_SAFETY_ARMED;
    }

    Heartbeat {
        source: ScriptedTransport::VEHICLE,
        vehicle_type: MavType::Quadrotor as u8,
        autopilot: MAV_AUTOPILOT_ARDUPILOTMEGA,
        base_mode,
        custom_mode: 0,
        system_status: MavState::Active as u8,
    }
}

/// Heartbeat of a gimbal which shares system id with [`ScriptedTransport::VEHICLE`].
///
/// Gimbals are not flight controllers and always report empty base mode.
pub fn gimbal_heartbeat() -> Heartbeat {
    Heartbeat {
        source: ScriptedTransport::GIMBAL,
        vehicle_type: MavType::Gimbal as u8,
        autopilot: MAV_AUTOPILOT_INVALID,
        base_mode: 0,
        custom_mode: 0,
        system_status: MavState::Active as u8,
    }
}

/// Record of the interaction with a [`ScriptedTransport`].
///
/// Shared between the transport and the test, so it stays available after the transport was
/// moved into a session.
#[derive(Clone, Debug, Default)]
pub struct Journal(Arc<Mutex<JournalEntries>>);

#[derive(Debug, Default)]
struct JournalEntries {
    commands: Vec<CommandLong>,
    mode_table_requests: usize,
    receives: usize,
}

impl Journal {
    /// Commands sent through the transport, in order.
    pub fn commands(&self) -> Vec<CommandLong> {
        self.entries(|entries| entries.commands.clone())
    }

    /// Number of times the mode table was requested.
    pub fn mode_table_requests(&self) -> usize {
        self.entries(|entries| entries.mode_table_requests)
    }

    /// Number of receive calls.
    pub fn receives(&self) -> usize {
        self.entries(|entries| entries.receives)
    }

    fn entries<R>(&self, f: impl FnOnce(&mut JournalEntries) -> R) -> R {
        match self.0.lock() {
            Ok(mut entries) => f(&mut *entries),
            Err(poisoned) => f(&mut *poisoned.into_inner()),
        }
    }
}

/// [`Transport`] that replays scripted inbound messages.
///
/// By default mimics an ArduCopter: uses copter mode table and replies to arm and disarm commands
/// with a heartbeat in the corresponding state. When the script runs out, each receive blocks for
/// its whole timeout and yields nothing.
#[derive(Debug)]
pub struct ScriptedTransport {
    inbound: VecDeque<Message>,
    mode_table: Result<ModeTable>,
    journal: Journal,
    echo_arming: bool,
    failing_sends: bool,
    disconnected: bool,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self {
            inbound: VecDeque::new(),
            mode_table: Ok(ModeTable::ardupilot_copter()),
            journal: Journal::default(),
            echo_arming: true,
            failing_sends: false,
            disconnected: false,
        }
    }
}

impl ScriptedTransport {
    /// Vehicle that sends scripted messages.
    pub const VEHICLE: Target = Target {
        system_id: 1,
        component_id: 1,
    };

    /// Gimbal on board of [`ScriptedTransport::VEHICLE`].
    pub const GIMBAL: Target = Target {
        system_id: 1,
        component_id: 154,
    };

    /// Creates a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a heartbeat of a disarmed vehicle.
    pub fn with_heartbeat(self) -> Self {
        self.then(Message::Heartbeat(heartbeat(false)))
    }

    /// Appends a message.
    pub fn then(mut self, message: Message) -> Self {
        self.inbound.push_back(message);
        self
    }

    /// Appends a position report in raw wire units (degE7, degE7, millimeters).
    pub fn then_position(self, lat: i32, lon: i32, alt: i32) -> Self {
        self.then(Message::GlobalPositionInt(GlobalPositionInt {
            lat,
            lon,
            alt,
            relative_alt: 0,
        }))
    }

    /// Appends an acknowledgment for a command.
    pub fn then_ack(self, command: CommandKind, result: MavResult) -> Self {
        self.then(Message::CommandAck(CommandAck {
            command: command.code(),
            result,
        }))
    }

    /// Replaces result of mode table requests.
    pub fn with_mode_table(mut self, mode_table: Result<ModeTable>) -> Self {
        self.mode_table = mode_table;
        self
    }

    /// Makes every send fail.
    pub fn failing_sends(mut self) -> Self {
        self.failing_sends = true;
        self
    }

    /// Stops replying to arm and disarm commands.
    pub fn without_arming_echo(mut self) -> Self {
        self.echo_arming = false;
        self
    }

    /// Makes every operation fail with [`Error::Disconnected`].
    pub fn disconnected(mut self) -> Self {
        self.disconnected = true;
        self
    }

    /// Journal of this transport.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Number of scripted messages not consumed yet.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, command: &CommandLong) -> Result<()> {
        if self.disconnected {
            return Err(Error::Disconnected);
        }
        if self.failing_sends {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into());
        }

        self.journal.entries(|entries| entries.commands.push(*command));

        if self.echo_arming && command.command == MAV_CMD_COMPONENT_ARM_DISARM {
            let armed = command.param(1) == Some(1.0);
            self.inbound.push_front(Message::Heartbeat(heartbeat(armed)));
        }

        Ok(())
    }

    fn receive(&mut self, kinds: &[MessageKind], timeout: Duration) -> Result<Option<Message>> {
        self.journal.entries(|entries| entries.receives += 1);
        if self.disconnected {
            return Err(Error::Disconnected);
        }

        while let Some(message) = self.inbound.pop_front() {
            if kinds.contains(&message.kind()) {
                return Ok(Some(message));
            }
        }

        thread::sleep(timeout);
        Ok(None)
    }

    fn mode_table(&mut self) -> Result<ModeTable> {
        if self.disconnected {
            return Err(Error::Disconnected);
        }

        self.journal.entries(|entries| entries.mode_table_requests += 1);
        self.mode_table.clone()
    }
}
