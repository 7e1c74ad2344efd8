//! # Mavctl I/O
//!
//! The controller talks to a vehicle through a [`Transport`]: a bidirectional channel that accepts
//! outbound [`CommandLong`] commands and yields inbound [`Message`]s. Transports are opened by a
//! [`Connector`] from an endpoint string which is opaque to the rest of the crate.
//!
//! A MAVLink implementation backed by [Mavio](https://crates.io/crates/mavio) lives in the
//! [`mavlink`] module.
//!
//! Blocking waits for a particular inbound message are performed by the [`Correlator`].

mod cancel;
mod correlator;
pub mod mavlink;

use std::time::{Duration, Instant};

use crate::consts::MIN_POLL_INTERVAL;
use crate::protocol::{CommandLong, Heartbeat, Message, MessageKind, ModeTable};

use crate::prelude::*;

pub use cancel::CancelToken;
pub use correlator::{Correlation, Correlator, Expect};

/// Bidirectional channel to a vehicle.
///
/// Implementors should not buffer messages for later delivery: [`Transport::receive`] drops
/// messages of kinds the caller is not interested in.
pub trait Transport: Send {
    /// Sends a command to the vehicle.
    fn send(&mut self, command: &CommandLong) -> Result<()>;

    /// Receives the next message of one of the specified `kinds` within `timeout`.
    ///
    /// Messages of other kinds are dropped. Returns [`None`] once `timeout` is elapsed.
    fn receive(&mut self, kinds: &[MessageKind], timeout: Duration) -> Result<Option<Message>>;

    /// Returns a mode table of the connected vehicle.
    ///
    /// Fails if vehicle did not report enough about itself to build one.
    fn mode_table(&mut self) -> Result<ModeTable>;

    /// Blocks until a heartbeat is received.
    ///
    /// Each receive attempt is bounded by `poll_interval`, which is never shorter than
    /// [`MIN_POLL_INTERVAL`](crate::consts::MIN_POLL_INTERVAL). If `timeout` is [`None`], waits
    /// until either a heartbeat arrives, or `cancel` token is cancelled. Returns [`None`] on
    /// timeout or cancellation.
    fn handshake_wait(
        &mut self,
        poll_interval: Duration,
        timeout: Option<Duration>,
        cancel: &CancelToken,
    ) -> Result<Option<Heartbeat>> {
        let poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        let started = Instant::now();

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            let attempt = match timeout {
                None => poll_interval,
                Some(timeout) => match timeout.checked_sub(started.elapsed()) {
                    Some(remaining) if !remaining.is_zero() => remaining.min(poll_interval),
                    _ => return Ok(None),
                },
            };

            if let Some(Message::Heartbeat(heartbeat)) =
                self.receive(&[MessageKind::Heartbeat], attempt)?
            {
                return Ok(Some(heartbeat));
            }
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, command: &CommandLong) -> Result<()> {
        (**self).send(command)
    }

    fn receive(&mut self, kinds: &[MessageKind], timeout: Duration) -> Result<Option<Message>> {
        (**self).receive(kinds, timeout)
    }

    fn mode_table(&mut self) -> Result<ModeTable> {
        (**self).mode_table()
    }

    fn handshake_wait(
        &mut self,
        poll_interval: Duration,
        timeout: Option<Duration>,
        cancel: &CancelToken,
    ) -> Result<Option<Heartbeat>> {
        (**self).handshake_wait(poll_interval, timeout, cancel)
    }
}

/// Opens [`Transport`]s from endpoint strings.
pub trait Connector {
    /// Transport produced by this connector.
    type Transport: Transport;

    /// Opens a transport for `endpoint`.
    ///
    /// The format of `endpoint` is defined by the connector.
    fn open(&self, endpoint: &str) -> Result<Self::Transport>;
}
