use std::time::Duration;

use crate::errors::{CommandError, ConnectionError};
use crate::io::{CancelToken, Correlation, Correlator, Expect, Transport};
use crate::protocol::{Command, CommandKind, GlobalPositionInt, Message, MessageKind, Target};
use crate::session::Timeouts;
use crate::telemetry::{self, TelemetrySnapshot};

use crate::prelude::*;

/// Live link to a vehicle.
///
/// Owns the transport exclusively. A link exists only after a successful handshake, so every
/// command it sends is addressed to a vehicle that has been heard from.
///
/// Obtained through [`Session::lock`](super::Session::lock).
pub struct Link<T: Transport> {
    transport: T,
    target: Target,
    timeouts: Timeouts,
    correlator: Correlator,
}

impl<T: Transport> Link<T> {
    /// Waits for the first heartbeat on `transport` and binds the link to its sender.
    pub(crate) fn handshake(
        mut transport: T,
        timeouts: Timeouts,
        cancel: CancelToken,
    ) -> Result<Self> {
        log::debug!("[session] waiting for heartbeat");

        let heartbeat = transport
            .handshake_wait(timeouts.poll_interval, timeouts.handshake, &cancel)
            .map_err(|err| ConnectionError::HandshakeFailed(Box::new(err)))?;

        let heartbeat = match heartbeat {
            Some(heartbeat) => heartbeat,
            None if cancel.is_cancelled() => return Err(Error::Cancelled),
            None => {
                return Err(ConnectionError::HandshakeTimeout(
                    timeouts.handshake.unwrap_or_default(),
                )
                .into())
            }
        };

        log::info!(
            "[session] heartbeat from system {} component {}",
            heartbeat.source.system_id,
            heartbeat.source.component_id
        );

        Ok(Self {
            transport,
            target: heartbeat.source,
            timeouts,
            correlator: Correlator::new(timeouts.poll_interval).with_cancel_token(cancel),
        })
    }

    /// Vehicle this link is bound to.
    pub fn target(&self) -> Target {
        self.target
    }

    /// Timeouts of this link.
    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Sends a command to the vehicle.
    pub fn send(&mut self, command: Command) -> Result<()> {
        let wire = command.encode(self.target);
        log::debug!("[session] sending {} to {}", command.kind(), self.target);

        self.transport.send(&wire).map_err(|err| {
            CommandError::Send {
                command: command.kind(),
                source: Box::new(err),
            }
            .into()
        })
    }

    /// Arms motors and waits for the vehicle to report them armed.
    pub fn arm(&mut self) -> Result<()> {
        self.send(Command::Arm)?;
        self.wait_armed(true, CommandKind::Arm)?;
        log::info!("[session] motors armed");
        Ok(())
    }

    /// Disarms motors and waits for the vehicle to report them disarmed.
    pub fn disarm(&mut self) -> Result<()> {
        self.send(Command::Disarm)?;
        self.wait_armed(false, CommandKind::Disarm)?;
        log::info!("[session] motors disarmed");
        Ok(())
    }

    /// Switches vehicle to a flight mode.
    ///
    /// Mode table is requested from the transport on each call. Nothing is sent if the mode is
    /// unknown to the vehicle.
    pub fn set_mode(&mut self, name: &str) -> Result<()> {
        let table = self.transport.mode_table().map_err(|err| match err {
            err @ Error::Command(CommandError::ModeTable { .. }) => err,
            err => CommandError::ModeTable {
                reason: "transport failed".to_string(),
                source: Some(Box::new(err)),
            }
            .into(),
        })?;

        let mode_id = table
            .get(name)
            .ok_or_else(|| Error::UnknownMode(name.to_string()))?;

        self.send(Command::SetMode { mode_id })?;
        log::info!("[session] mode {name} ({mode_id}) requested");
        Ok(())
    }

    /// Waits for a message that satisfies `expect`.
    pub fn wait_for(&mut self, expect: &Expect, timeout: Duration) -> Correlation {
        self.correlator.wait_for(&mut self.transport, expect, timeout)
    }

    /// Waits for an acknowledgment of a command and checks its result.
    ///
    /// Fails with [`Error::CommandNotConfirmed`] if the vehicle replied with anything other than
    /// `ACCEPTED` or did not reply within `timeout`.
    pub fn wait_for_ack(&mut self, command: CommandKind, timeout: Duration) -> Result<()> {
        match self.wait_for(&Expect::ack(command), timeout) {
            Correlation::Matched(Message::CommandAck(ack)) if ack.result.is_accepted() => {
                log::debug!("[session] {command} accepted");
                Ok(())
            }
            Correlation::Matched(Message::CommandAck(ack)) => Err(Error::CommandNotConfirmed {
                command,
                result: Some(ack.result),
            }),
            Correlation::Matched(_) | Correlation::TimedOut => Err(Error::CommandNotConfirmed {
                command,
                result: None,
            }),
            Correlation::Cancelled => Err(Error::Cancelled),
        }
    }

    /// Waits for a position report.
    pub fn wait_position(&mut self) -> Result<GlobalPositionInt> {
        let timeout = self.timeouts.position;

        match self.wait_for(&Expect::kind(MessageKind::GlobalPositionInt), timeout) {
            Correlation::Matched(Message::GlobalPositionInt(position)) => Ok(position),
            Correlation::Cancelled => Err(Error::Cancelled),
            _ => Err(Error::PositionUnavailable(timeout)),
        }
    }

    /// Reads a single telemetry message.
    pub fn read_telemetry(&mut self) -> Option<TelemetrySnapshot> {
        telemetry::read(&mut self.transport, self.timeouts.telemetry)
    }

    /// Underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn wait_armed(&mut self, armed: bool, command: CommandKind) -> Result<()> {
        let timeout = self.timeouts.arm;

        match self.wait_for(&Expect::armed(self.target, armed), timeout) {
            Correlation::Matched(_) => Ok(()),
            Correlation::TimedOut => Err(CommandError::Unconfirmed { command, timeout }.into()),
            Correlation::Cancelled => Err(Error::Cancelled),
        }
    }
}
