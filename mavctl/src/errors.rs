//! # Mavctl errors
//!
//! Every fallible operation of this crate returns [`Result`]. Errors raised below the flight
//! command engine are wrapped into [`Error::Flight`] which names the failing operation and step
//! while preserving the original cause. Use [`Error::cause`] to reach it.
//!
//! Missing telemetry is not an error: telemetry readers return [`None`] instead.

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use crate::flight::{Operation, Step};
use crate::protocol::{CommandKind, MavResult};

/// Common result type returned by `mavctl` functions.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors produced by `mavctl`.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// Link to the vehicle can't be established.
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Caller-supplied argument violates a precondition. Detected before any side effect.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// What is wrong with the value.
        reason: String,
    },

    /// Requested mode is absent from the vehicle mode table.
    #[error("unknown mode: {0}")]
    UnknownMode(String),

    /// A command primitive failed.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Vehicle denied the command or did not acknowledge it in time.
    ///
    /// `result` is [`None`] when no acknowledgment arrived within the timeout.
    #[error("{command} not confirmed: {}", describe_result(.result))]
    CommandNotConfirmed {
        /// Command that was awaiting acknowledgment.
        command: CommandKind,
        /// Observed result code, if any.
        result: Option<MavResult>,
    },

    /// Vehicle position was not reported within the timeout.
    #[error("position is not available after {0:?}")]
    PositionUnavailable(Duration),

    /// Flight operation failed at a particular step.
    #[error("{operation} failed at {step}: {source}")]
    Flight {
        /// Failed operation.
        operation: Operation,
        /// Step at which the operation failed.
        step: Step,
        /// Original cause.
        #[source]
        source: Box<Error>,
    },

    /// Wait was cancelled through a [`CancelToken`](crate::io::CancelToken).
    #[error("cancelled")]
    Cancelled,

    /// Transport is no longer connected.
    #[error("link disconnected")]
    Disconnected,

    /// Session lock was poisoned by a panicking thread.
    #[error("session lock is poisoned")]
    Poisoned,

    /// Endpoint string is not understood by the transport.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    /// MAVLink encoding or decoding error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error.
    #[error("I/O error: {0:?}")]
    Io(Arc<std::io::Error>),
}

/// Errors related to establishing a link.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transport can't be opened.
    #[error("can't open `{endpoint}`: {source}")]
    Open {
        /// Endpoint as passed by the caller.
        endpoint: String,
        /// Transport error.
        #[source]
        source: Box<Error>,
    },
    /// No heartbeat was observed within the handshake timeout.
    #[error("no heartbeat within {0:?}")]
    HandshakeTimeout(Duration),
    /// Transport failed while waiting for a heartbeat.
    #[error("handshake failed: {0}")]
    HandshakeFailed(#[source] Box<Error>),
}

/// Errors of link command primitives (arm, disarm, set mode).
#[derive(Clone, Debug, thiserror::Error)]
pub enum CommandError {
    /// Vehicle mode table is not available.
    #[error("mode table is not available: {reason}")]
    ModeTable {
        /// Why the table can't be built.
        reason: String,
        /// Transport error, if the table was not produced because of it.
        #[source]
        source: Option<Box<Error>>,
    },
    /// Command can't be sent.
    #[error("can't send {command}: {source}")]
    Send {
        /// Command kind.
        command: CommandKind,
        /// Transport error.
        #[source]
        source: Box<Error>,
    },
    /// Vehicle did not report the expected state within the timeout.
    #[error("{command} was not confirmed within {timeout:?}")]
    Unconfirmed {
        /// Command kind.
        command: CommandKind,
        /// Timeout that elapsed.
        timeout: Duration,
    },
}

impl CommandError {
    pub(crate) fn mode_table(reason: impl Into<String>) -> Self {
        CommandError::ModeTable {
            reason: reason.into(),
            source: None,
        }
    }
}

impl Error {
    /// Returns the innermost error, unwrapping [`Error::Flight`].
    pub fn cause(&self) -> &Error {
        match self {
            Error::Flight { source, .. } => source.cause(),
            err => err,
        }
    }

    /// Returns the failed step if this is an [`Error::Flight`].
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::Flight { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

fn describe_result(result: &Option<MavResult>) -> String {
    match result {
        Some(result) => format!("vehicle replied with {result}"),
        None => "no acknowledgment".to_string(),
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

#[cfg(feature = "serial")]
impl From<serialport::Error> for Error {
    fn from(value: serialport::Error) -> Self {
        Self::Io(Arc::new(value.into()))
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}
