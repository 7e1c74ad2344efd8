use crate::consts::{LAND_MODE, TAKEOFF_MODE};
use crate::flight::{FlightObserver, Operation, Step};
use crate::io::Transport;
use crate::protocol::{Command, CommandKind};
use crate::session::Link;

use crate::prelude::*;

/// Runs flight operations on an exclusively borrowed [`Link`].
pub struct FlightCommander<'a, T: Transport> {
    link: &'a mut Link<T>,
    observer: &'a dyn FlightObserver,
}

impl<'a, T: Transport> FlightCommander<'a, T> {
    /// Creates a commander for a link.
    pub fn new(link: &'a mut Link<T>, observer: &'a dyn FlightObserver) -> Self {
        Self { link, observer }
    }

    /// Takes off to `altitude` meters.
    ///
    /// Switches to `GUIDED` mode, arms motors, waits for the current position and sends
    /// `MAV_CMD_NAV_TAKEOFF` at this position. Succeeds once the vehicle acknowledges the command
    /// with `ACCEPTED`.
    ///
    /// `altitude` must be finite and positive, otherwise fails before anything is sent.
    pub fn takeoff(&mut self, altitude: f64) -> Result<()> {
        let op = Operation::Takeoff;

        self.run(op, Step::Validate, |_| validate_altitude(altitude))?;
        self.run(op, Step::ModeSet, |link| link.set_mode(TAKEOFF_MODE))?;
        self.run(op, Step::Armed, |link| link.arm())?;
        let position = self.run(op, Step::PositionAcquired, |link| link.wait_position())?;

        let command = Command::Takeoff {
            latitude: position.latitude(),
            longitude: position.longitude(),
            altitude,
        };
        log::info!(
            "[{op}] to {altitude} m at {:.7}, {:.7}",
            position.latitude(),
            position.longitude()
        );
        self.run(op, Step::CommandSent, |link| link.send(command))?;

        self.run(op, Step::AckAwaited, |link| {
            let timeout = link.timeouts().ack;
            link.wait_for_ack(command.kind(), timeout)
        })?;

        self.confirm(op);
        Ok(())
    }

    /// Lands at the current position.
    ///
    /// Switches to `LAND` mode and waits for the vehicle to acknowledge `MAV_CMD_NAV_LAND` with
    /// `ACCEPTED`.
    pub fn land(&mut self) -> Result<()> {
        let op = Operation::Land;

        self.run(op, Step::ModeSet, |link| link.set_mode(LAND_MODE))?;
        self.run(op, Step::AckAwaited, |link| {
            let timeout = link.timeouts().ack;
            link.wait_for_ack(CommandKind::Land, timeout)
        })?;

        self.confirm(op);
        Ok(())
    }

    fn run<R>(
        &mut self,
        operation: Operation,
        step: Step,
        f: impl FnOnce(&mut Link<T>) -> Result<R>,
    ) -> Result<R> {
        self.observer.on_step(operation, step);

        f(&mut *self.link).map_err(|err| {
            self.observer.on_failure(operation, step, &err);
            Error::Flight {
                operation,
                step,
                source: Box::new(err),
            }
        })
    }

    fn confirm(&self, operation: Operation) {
        self.observer.on_step(operation, Step::Confirmed);
        self.observer.on_complete(operation);
    }
}

fn validate_altitude(altitude: f64) -> Result<()> {
    if !altitude.is_finite() {
        return Err(Error::invalid_parameter("altitude", "must be finite"));
    }
    if altitude <= 0.0 {
        return Err(Error::invalid_parameter(
            "altitude",
            format!("must be positive, got {altitude}"),
        ));
    }
    Ok(())
}
