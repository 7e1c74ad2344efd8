use std::thread;
use std::time::{Duration, Instant};

use crate::consts::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
use crate::io::{CancelToken, Transport};
use crate::protocol::{CommandKind, Message, MessageKind, Target};

/// Predicate for an awaited inbound message.
///
/// Consists of a set of acceptable message kinds and an optional matcher for the message
/// content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expect {
    kinds: Vec<MessageKind>,
    matcher: Matcher,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Matcher {
    Any,
    Ack(u16),
    Armed(Target, bool),
}

impl Expect {
    /// Any message of the specified kind.
    pub fn kind(kind: MessageKind) -> Self {
        Self::any_of(&[kind])
    }

    /// Any message of one of the specified kinds.
    pub fn any_of(kinds: &[MessageKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            matcher: Matcher::Any,
        }
    }

    /// `COMMAND_ACK` for a command of the specified kind, regardless of result.
    pub fn ack(command: CommandKind) -> Self {
        Self::ack_code(command.code())
    }

    /// `COMMAND_ACK` for the specified command code, regardless of result.
    pub fn ack_code(command: u16) -> Self {
        Self {
            kinds: vec![MessageKind::CommandAck],
            matcher: Matcher::Ack(command),
        }
    }

    /// Heartbeat of the `target` component that reports motors in the specified state.
    ///
    /// Heartbeats of other components of the same system (gimbals, cameras, companion
    /// computers) do not match, since they do not carry the state of the motors.
    pub fn armed(target: Target, armed: bool) -> Self {
        Self {
            kinds: vec![MessageKind::Heartbeat],
            matcher: Matcher::Armed(target, armed),
        }
    }

    /// Message kinds requested from the transport.
    pub fn kinds(&self) -> &[MessageKind] {
        self.kinds.as_slice()
    }

    /// Returns `true` if `message` satisfies this predicate.
    pub fn matches(&self, message: &Message) -> bool {
        if !self.kinds.contains(&message.kind()) {
            return false;
        }

        match (self.matcher, message) {
            (Matcher::Any, _) => true,
            (Matcher::Ack(command), Message::CommandAck(ack)) => ack.command == command,
            (Matcher::Armed(target, armed), Message::Heartbeat(heartbeat)) => {
                heartbeat.source == target && heartbeat.is_armed() == armed
            }
            _ => false,
        }
    }
}

/// Outcome of [`Correlator::wait_for`].
#[derive(Clone, Debug, PartialEq)]
pub enum Correlation {
    /// A matching message arrived.
    Matched(Message),
    /// Deadline was reached.
    TimedOut,
    /// Wait was cancelled.
    Cancelled,
}

impl Correlation {
    /// Returns matched message, if any.
    pub fn into_message(self) -> Option<Message> {
        match self {
            Correlation::Matched(message) => Some(message),
            _ => None,
        }
    }
}

/// Waits for inbound messages that satisfy an [`Expect`] predicate.
///
/// Each pull from a transport is bounded by a poll interval, the whole wait is bounded by a
/// timeout. Messages that do not match are dropped.
#[derive(Clone, Debug)]
pub struct Correlator {
    poll_interval: Duration,
    cancel: CancelToken,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl Correlator {
    /// Creates a correlator with a specified poll interval.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            cancel: CancelToken::new(),
        }
    }

    /// Sets cancellation token checked before each poll.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Poll interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Cancellation token.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Pulls messages from `transport` until one satisfies `expect` or `timeout` is elapsed.
    ///
    /// Never fails: transport errors are logged and the wait continues until the deadline.
    pub fn wait_for<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        expect: &Expect,
        timeout: Duration,
    ) -> Correlation {
        let started = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                log::debug!("[correlator] wait for {expect:?} cancelled");
                return Correlation::Cancelled;
            }

            let attempt = match timeout.checked_sub(started.elapsed()) {
                Some(remaining) if !remaining.is_zero() => remaining.min(self.poll_interval),
                _ => {
                    log::debug!("[correlator] no match for {expect:?} within {timeout:?}");
                    return Correlation::TimedOut;
                }
            };

            match transport.receive(expect.kinds(), attempt) {
                Ok(Some(message)) if expect.matches(&message) => {
                    return Correlation::Matched(message);
                }
                Ok(Some(message)) => {
                    log::trace!("[correlator] dropping {message:?} while waiting for {expect:?}");
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!("[correlator] receive failed: {err}");
                    thread::sleep(attempt);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CommandAck, GlobalPositionInt, MavResult};
    use crate::test_utils::{gimbal_heartbeat, heartbeat, ScriptedTransport};

    const POLL: Duration = Duration::from_millis(10);

    #[test]
    fn returns_first_matching_message() {
        let mut transport = ScriptedTransport::new()
            .then_ack(CommandKind::SetMode, MavResult::Accepted)
            .then_ack(CommandKind::Takeoff, MavResult::Denied);

        let correlation = Correlator::new(POLL).wait_for(
            &mut transport,
            &Expect::ack(CommandKind::Takeoff),
            Duration::from_secs(1),
        );

        assert_eq!(
            correlation,
            Correlation::Matched(Message::CommandAck(CommandAck {
                command: CommandKind::Takeoff.code(),
                result: MavResult::Denied,
            }))
        );
    }

    #[test]
    fn non_matching_messages_are_dropped() {
        let mut transport = ScriptedTransport::new()
            .then(Message::GlobalPositionInt(GlobalPositionInt::default()))
            .then_ack(CommandKind::Land, MavResult::Accepted);

        let correlation = Correlator::new(POLL).wait_for(
            &mut transport,
            &Expect::ack(CommandKind::Takeoff),
            Duration::from_millis(50),
        );

        assert_eq!(correlation, Correlation::TimedOut);
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn times_out_within_one_poll_interval() {
        let mut transport = ScriptedTransport::new();
        let timeout = Duration::from_millis(100);

        let started = Instant::now();
        let correlation = Correlator::new(POLL).wait_for(
            &mut transport,
            &Expect::kind(MessageKind::VfrHud),
            timeout,
        );
        let elapsed = started.elapsed();

        assert_eq!(correlation, Correlation::TimedOut);
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + POLL * 5);
    }

    #[test]
    fn matches_armed_state_of_heartbeats() {
        let mut transport = ScriptedTransport::new()
            .then(Message::Heartbeat(heartbeat(false)))
            .then(Message::Heartbeat(heartbeat(true)));

        let correlation = Correlator::new(POLL).wait_for(
            &mut transport,
            &Expect::armed(ScriptedTransport::VEHICLE, true),
            Duration::from_secs(1),
        );

        assert_eq!(correlation, Correlation::Matched(Message::Heartbeat(heartbeat(true))));
    }

    #[test]
    fn armed_state_of_other_components_is_ignored() {
        let mut transport = ScriptedTransport::new()
            .then(Message::Heartbeat(gimbal_heartbeat()))
            .then(Message::Heartbeat(heartbeat(true)));

        let correlation = Correlator::new(POLL).wait_for(
            &mut transport,
            &Expect::armed(ScriptedTransport::VEHICLE, false),
            Duration::from_millis(50),
        );

        assert_eq!(correlation, Correlation::TimedOut);
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn cancelled_token_stops_waiting() {
        let mut transport = ScriptedTransport::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let correlation = Correlator::new(POLL).with_cancel_token(cancel).wait_for(
            &mut transport,
            &Expect::kind(MessageKind::Heartbeat),
            Duration::from_secs(10),
        );

        assert_eq!(correlation, Correlation::Cancelled);
    }

    #[test]
    fn transport_errors_do_not_escape() {
        let mut transport = ScriptedTransport::new().disconnected();

        let correlation = Correlator::new(POLL).wait_for(
            &mut transport,
            &Expect::kind(MessageKind::Heartbeat),
            Duration::from_millis(30),
        );

        assert_eq!(correlation, Correlation::TimedOut);
    }
}
